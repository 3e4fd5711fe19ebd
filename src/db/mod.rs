//! Database layer: the credential store behind an injectable trait.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryUserStore;

use crate::error::AppError;
use crate::models::{NewUser, UserRecord, UserUpdate};
use async_trait::async_trait;
use ring::rand::{SecureRandom, SystemRandom};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
}

/// Persistent user records, keyed by store-assigned id.
///
/// Every write touches a single document, so the store's per-document
/// atomicity is the only concurrency guarantee callers rely on.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get a user by id.
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, AppError>;

    /// Get the first user whose email or username matches either value.
    async fn find_by_email_or_user_name(
        &self,
        email: Option<&str>,
        user_name: Option<&str>,
    ) -> Result<Option<UserRecord>, AppError>;

    /// Insert a new user. Fails with `Conflict` if the email or username is taken.
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, AppError>;

    /// Apply a partial update. Returns `None` if the user does not exist.
    async fn update_user(
        &self,
        user_id: &str,
        update: UserUpdate,
    ) -> Result<Option<UserRecord>, AppError>;

    /// Replace (or clear) the stored refresh-token digest.
    ///
    /// Returns `false` if the user does not exist.
    async fn set_refresh_token(
        &self,
        user_id: &str,
        token_digest: Option<&str>,
    ) -> Result<bool, AppError>;
}

/// Generate a fresh 24-hex-character user id.
pub fn new_user_id() -> Result<String, AppError> {
    let mut bytes = [0u8; 12];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG unavailable")))?;
    Ok(hex::encode(bytes))
}
