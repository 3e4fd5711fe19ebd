// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing the credential store.
//!
//! Users live in a single `users` collection keyed by their store-assigned
//! id. Partial writes use field masks so a profile update can never
//! clobber a concurrently rotated refresh token.

use crate::db::{collections, new_user_id, UserStore};
use crate::error::AppError;
use crate::models::{NewUser, UserRecord, UserUpdate};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use firestore::paths;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a disconnected client (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn write_user(&self, user: &UserRecord) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for FirestoreDb {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_by_email_or_user_name(
        &self,
        email: Option<&str>,
        user_name: Option<&str>,
    ) -> Result<Option<UserRecord>, AppError> {
        if email.is_none() && user_name.is_none() {
            return Ok(None);
        }

        let email = email.map(str::to_string);
        let user_name = user_name.map(str::to_string);

        let users: Vec<UserRecord> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| {
                q.for_any([
                    email.clone().and_then(|e| q.field("email").eq(e)),
                    user_name.clone().and_then(|u| q.field("user_name").eq(u)),
                ])
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, AppError> {
        // Firestore has no unique indexes; check before writing.
        if self
            .find_by_email_or_user_name(Some(&user.email), Some(&user.user_name))
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "User with this email or username already exists".to_string(),
            ));
        }

        let now = format_utc_rfc3339(chrono::Utc::now());
        let record = UserRecord {
            id: new_user_id()?,
            full_name: user.full_name,
            email: user.email,
            user_name: user.user_name,
            password: user.password_hash,
            avatar: user.avatar,
            cover_image: user.cover_image,
            refresh_token: None,
            created_at: now.clone(),
            updated_at: now,
        };

        self.write_user(&record).await?;
        tracing::info!(user_id = %record.id, "User document created");

        Ok(record)
    }

    async fn update_user(
        &self,
        user_id: &str,
        update: UserUpdate,
    ) -> Result<Option<UserRecord>, AppError> {
        let Some(mut record) = self.find_by_id(user_id).await? else {
            return Ok(None);
        };

        // Same best-effort check as insert_user.
        if let Some(email) = update.email.as_deref() {
            if self
                .find_by_email_or_user_name(Some(email), None)
                .await?
                .is_some_and(|other| other.id != user_id)
            {
                return Err(AppError::Conflict(
                    "Email is already used by another account".to_string(),
                ));
            }
        }

        let now = format_utc_rfc3339(chrono::Utc::now());
        update.apply(&mut record, &now);

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths!(UserRecord::{
                full_name,
                email,
                password,
                avatar,
                cover_image,
                updated_at
            }))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Some(record))
    }

    async fn set_refresh_token(
        &self,
        user_id: &str,
        token_digest: Option<&str>,
    ) -> Result<bool, AppError> {
        let Some(mut record) = self.find_by_id(user_id).await? else {
            return Ok(false);
        };
        record.refresh_token = token_digest.map(str::to_string);

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths!(UserRecord::{refresh_token}))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(
            user_id,
            cleared = token_digest.is_none(),
            "Refresh token slot updated"
        );
        Ok(true)
    }
}
