//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User document stored in the credential store.
///
/// Holds secrets (`password`, `refresh_token`); convert to [`PublicUser`]
/// before anything leaves the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    /// Store-assigned identifier (also used as document ID)
    pub id: String,
    pub full_name: String,
    /// Unique, stored lowercase
    pub email: String,
    /// Unique, stored lowercase
    pub user_name: String,
    /// argon2id PHC string
    pub password: String,
    /// Avatar URL on the media host
    pub avatar: String,
    /// Cover image URL, if one was uploaded
    #[serde(default)]
    pub cover_image: Option<String>,
    /// Hex SHA-256 digest of the single currently-valid refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields required to create a user; the store assigns `id` and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub user_name: String,
    pub password_hash: String,
    pub avatar: String,
    pub cover_image: Option<String>,
}

/// Partial update applied to an existing user document.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
}

impl UserUpdate {
    /// Apply the update in place, leaving untouched fields alone.
    pub fn apply(self, record: &mut UserRecord, now: &str) {
        if let Some(full_name) = self.full_name {
            record.full_name = full_name;
        }
        if let Some(email) = self.email {
            record.email = email;
        }
        if let Some(password_hash) = self.password_hash {
            record.password = password_hash;
        }
        if let Some(avatar) = self.avatar {
            record.avatar = avatar;
        }
        if let Some(cover_image) = self.cover_image {
            record.cover_image = Some(cover_image);
        }
        record.updated_at = now.to_string();
    }
}

/// Sanitized user profile returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PublicUser {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub user_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&UserRecord> for PublicUser {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id.clone(),
            full_name: record.full_name.clone(),
            email: record.email.clone(),
            user_name: record.user_name.clone(),
            avatar: record.avatar.clone(),
            cover_image: record.cover_image.clone(),
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
        }
    }
}

impl From<UserRecord> for PublicUser {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            full_name: record.full_name,
            email: record.email,
            user_name: record.user_name,
            avatar: record.avatar,
            cover_image: record.cover_image,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> UserRecord {
        UserRecord {
            id: "65f0c0ffee0000000000abcd".to_string(),
            full_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            user_name: "ada".to_string(),
            password: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            avatar: "https://media.example.com/ada.png".to_string(),
            cover_image: None,
            refresh_token: Some("deadbeef".to_string()),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_public_user_drops_secrets() {
        let json = serde_json::to_value(PublicUser::from(&record())).unwrap();
        let obj = json.as_object().unwrap();

        assert!(!obj.contains_key("password"));
        assert!(!obj.contains_key("refreshToken"));
        assert!(!obj.contains_key("refresh_token"));
        assert_eq!(obj["userName"], "ada");
        assert_eq!(obj["fullName"], "Ada Lovelace");
    }

    #[test]
    fn test_update_touches_only_given_fields() {
        let mut user = record();
        UserUpdate {
            avatar: Some("https://media.example.com/new.png".to_string()),
            ..Default::default()
        }
        .apply(&mut user, "2026-02-02T00:00:00Z");

        assert_eq!(user.avatar, "https://media.example.com/new.png");
        assert_eq!(user.full_name, "Ada Lovelace");
        assert_eq!(user.refresh_token.as_deref(), Some("deadbeef"));
        assert_eq!(user.updated_at, "2026-02-02T00:00:00Z");
    }
}
