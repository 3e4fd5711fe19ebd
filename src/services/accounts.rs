// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account registration and profile maintenance.

use crate::db::UserStore;
use crate::error::{AppError, FieldViolation, Result};
use crate::models::{NewUser, PublicUser, UserUpdate};
use crate::services::media::{MediaStore, UploadedFile};
use crate::services::password::hash_password;
use crate::validation::{self, not_blank, required_email};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Text fields of the registration form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    #[validate(custom(function = "not_blank"))]
    pub full_name: String,
    #[validate(custom(function = "required_email"))]
    pub email: String,
    #[validate(custom(function = "not_blank"))]
    pub user_name: String,
    #[validate(custom(function = "not_blank"))]
    pub password: String,
}

/// Profile fields a user may change.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub full_name: String,
    #[serde(default)]
    #[validate(custom(function = "required_email"))]
    pub email: String,
}

/// Which image slot an upload targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Avatar,
    CoverImage,
}

impl ImageSlot {
    /// Multipart field name for this slot.
    pub fn field_name(self) -> &'static str {
        match self {
            ImageSlot::Avatar => "avatar",
            ImageSlot::CoverImage => "coverImage",
        }
    }
}

/// Registration and profile operations.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UserStore>,
    media: Arc<dyn MediaStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn UserStore>, media: Arc<dyn MediaStore>) -> Self {
        Self { store, media }
    }

    /// Create a user from a validated form and uploaded images.
    ///
    /// Nothing is written unless every check and upload succeeds.
    pub async fn register(
        &self,
        form: RegisterUser,
        avatar: Option<UploadedFile>,
        cover_image: Option<UploadedFile>,
    ) -> Result<PublicUser> {
        let mut violations = validation::violations(&form);
        if avatar.is_none() {
            violations.push(FieldViolation::new("avatar", "Avatar file is required"));
        }
        validation::ensure(violations)?;
        let Some(avatar) = avatar else {
            return Err(AppError::invalid_field("avatar", "Avatar file is required"));
        };

        let full_name = form.full_name.trim().to_string();
        let email = form.email.trim().to_lowercase();
        let user_name = form.user_name.trim().to_lowercase();

        if self
            .store
            .find_by_email_or_user_name(Some(&email), Some(&user_name))
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "User with this email or username already exists".to_string(),
            ));
        }

        let avatar_url = self.media.upload(avatar).await?;
        let cover_image_url = match cover_image {
            Some(file) => Some(self.media.upload(file).await?),
            None => None,
        };

        let record = self
            .store
            .insert_user(NewUser {
                full_name,
                email,
                user_name,
                password_hash: hash_password(&form.password)?,
                avatar: avatar_url,
                cover_image: cover_image_url,
            })
            .await?;

        tracing::info!(user_id = %record.id, user_name = %record.user_name, "User registered");
        Ok(PublicUser::from(record))
    }

    /// Look up the sanitized profile of a user.
    pub async fn current_user(&self, user_id: &str) -> Result<PublicUser> {
        self.store
            .find_by_id(user_id)
            .await?
            .map(PublicUser::from)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    /// Change full name and email.
    pub async fn update_account_details(
        &self,
        user_id: &str,
        request: &UpdateAccountRequest,
    ) -> Result<PublicUser> {
        validation::ensure_valid(request)?;

        let email = request.email.trim().to_lowercase();
        if let Some(other) = self
            .store
            .find_by_email_or_user_name(Some(&email), None)
            .await?
        {
            if other.id != user_id {
                return Err(AppError::Conflict(
                    "Email is already used by another account".to_string(),
                ));
            }
        }

        let update = UserUpdate {
            full_name: Some(request.full_name.trim().to_string()),
            email: Some(email),
            ..Default::default()
        };
        let record = self
            .store
            .update_user(user_id, update)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        tracing::info!(user_id, "Account details updated");
        Ok(PublicUser::from(record))
    }

    /// Upload a new avatar or cover image and point the profile at it.
    pub async fn update_image(
        &self,
        user_id: &str,
        slot: ImageSlot,
        file: Option<UploadedFile>,
    ) -> Result<PublicUser> {
        let Some(file) = file else {
            return Err(AppError::invalid_field(slot.field_name(), "Image file is required"));
        };

        // Fail before uploading for users that no longer exist.
        if self.store.find_by_id(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }

        let url = self.media.upload(file).await?;
        let update = match slot {
            ImageSlot::Avatar => UserUpdate {
                avatar: Some(url),
                ..Default::default()
            },
            ImageSlot::CoverImage => UserUpdate {
                cover_image: Some(url),
                ..Default::default()
            },
        };

        let record = self
            .store
            .update_user(user_id, update)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        tracing::info!(user_id, slot = slot.field_name(), "Profile image updated");
        Ok(PublicUser::from(record))
    }
}
