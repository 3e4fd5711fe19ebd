// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle: login, logout, refresh-token rotation, password change.
//!
//! Each user has a single refresh-token slot. Login and refresh overwrite
//! it (rotation), logout clears it. A refresh token is only honoured while
//! its digest is the one in the slot, so every token is single-use.

use crate::db::UserStore;
use crate::error::{AppError, FieldViolation, Result};
use crate::models::{PublicUser, UserRecord, UserUpdate};
use crate::services::password::{hash_password, verify_password};
use crate::services::tokens::{
    digest_matches, refresh_token_digest, TokenPair, TokenRejection, TokenService,
};
use crate::validation::{self, not_blank};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Login payload: either identifier plus a password.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub password: String,
}

/// Password change payload.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub old_password: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub new_password: String,
}

/// Result of a successful login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub user: PublicUser,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Why refresh-token validation failed.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Rejected(#[from] TokenRejection),
    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<RefreshError> for AppError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Rejected(_) => AppError::InvalidToken,
            RefreshError::Store(e) => e,
        }
    }
}

/// Orchestrates authentication state over the credential store.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn UserStore>,
    tokens: TokenService,
}

impl SessionService {
    pub fn new(store: Arc<dyn UserStore>, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Verify credentials, then issue and persist a fresh token pair.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginOutcome> {
        let email = non_blank(request.email.as_deref()).map(str::to_lowercase);
        let user_name = non_blank(request.user_name.as_deref()).map(str::to_lowercase);

        let mut violations = validation::violations(request);
        if email.is_none() && user_name.is_none() {
            violations.push(FieldViolation::new(
                "userName",
                "username or email is required",
            ));
        }
        validation::ensure(violations)?;

        let user = self
            .store
            .find_by_email_or_user_name(email.as_deref(), user_name.as_deref())
            .await?
            .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

        if !verify_password(&request.password, &user.password)? {
            tracing::info!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let tokens = self.rotate(&user).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginOutcome {
            user: PublicUser::from(user),
            tokens,
        })
    }

    /// Clear the stored refresh token. Calling it again is a no-op.
    pub async fn logout(&self, user_id: &str) -> Result<()> {
        let found = self.store.set_refresh_token(user_id, None).await?;
        tracing::info!(user_id, found, "User logged out");
        Ok(())
    }

    /// Check a presented refresh token against its signature, expiry, and
    /// the digest currently stored for its subject.
    pub async fn validate_refresh_token(
        &self,
        token: &str,
    ) -> std::result::Result<UserRecord, RefreshError> {
        let claims = self.tokens.decode_refresh(token)?;

        let user = self
            .store
            .find_by_id(&claims.sub)
            .await?
            .ok_or(TokenRejection::UnknownUser)?;

        let current = user.refresh_token.as_deref().unwrap_or_default();
        if current.is_empty() || !digest_matches(current, token) {
            return Err(TokenRejection::Reused.into());
        }

        Ok(user)
    }

    /// Exchange a refresh token for a new pair, invalidating the old one.
    ///
    /// Every rejection reason is reported as `InvalidToken`.
    pub async fn refresh(&self, token: &str) -> Result<TokenPair> {
        if token.trim().is_empty() {
            return Err(AppError::InvalidToken);
        }

        let user = match self.validate_refresh_token(token).await {
            Ok(user) => user,
            Err(RefreshError::Rejected(reason)) => {
                tracing::warn!(reason = %reason, "Refresh token rejected");
                return Err(AppError::InvalidToken);
            }
            Err(RefreshError::Store(err)) => return Err(err),
        };

        let tokens = self.rotate(&user).await?;
        tracing::info!(user_id = %user.id, "Refresh token rotated");
        Ok(tokens)
    }

    /// Resolve an access token to the (still existing) user it was issued to.
    pub async fn authenticate(&self, access_token: &str) -> Result<PublicUser> {
        let claims = self.tokens.decode_access(access_token).map_err(|reason| {
            tracing::debug!(reason = %reason, "Access token rejected");
            AppError::InvalidToken
        })?;

        let user = self
            .store
            .find_by_id(&claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        Ok(PublicUser::from(user))
    }

    /// Replace the stored password hash after checking the old password.
    ///
    /// Outstanding tokens are left untouched.
    pub async fn change_password(
        &self,
        user_id: &str,
        request: &ChangePasswordRequest,
    ) -> Result<()> {
        validation::ensure_valid(request)?;

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

        if !verify_password(&request.old_password, &user.password)? {
            return Err(AppError::InvalidCredentials);
        }

        let update = UserUpdate {
            password_hash: Some(hash_password(&request.new_password)?),
            ..Default::default()
        };
        self.store
            .update_user(user_id, update)
            .await?
            .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    /// Issue a pair and make its refresh token the only valid one.
    async fn rotate(&self, user: &UserRecord) -> Result<TokenPair> {
        let tokens = self.tokens.issue_tokens(user)?;
        let digest = refresh_token_digest(&tokens.refresh_token);

        if !self.store.set_refresh_token(&user.id, Some(&digest)).await? {
            return Err(AppError::NotFound("User does not exist".to_string()));
        }

        Ok(tokens)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
