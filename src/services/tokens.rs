// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access and refresh token signing.
//!
//! Both token kinds are HS256 JWTs, each signed with its own key so a token
//! of one kind never verifies as the other. Nothing outside this module
//! depends on the JWT library.

use crate::config::Config;
use crate::error::AppError;
use crate::models::UserRecord;
use crate::time_utils::unix_now;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Access token claims.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// Subject (user id)
    pub sub: String,
    pub email: String,
    pub user_name: String,
    pub full_name: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Refresh token claims.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RefreshClaims {
    /// Subject (user id)
    pub sub: String,
    /// Random token id; two tokens minted in the same second still differ
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Freshly issued access/refresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Why a presented token was rejected.
///
/// Only used for logging; callers surface every variant as
/// [`AppError::InvalidToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenRejection {
    #[error("token is malformed or has a bad signature")]
    Malformed,
    #[error("token has expired")]
    Expired,
    #[error("token subject does not exist")]
    UnknownUser,
    #[error("token was superseded or revoked")]
    Reused,
}

impl From<TokenRejection> for AppError {
    fn from(_: TokenRejection) -> Self {
        AppError::InvalidToken
    }
}

impl From<jsonwebtoken::errors::Error> for TokenRejection {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenRejection::Expired,
            _ => TokenRejection::Malformed,
        }
    }
}

/// Issues and verifies tokens.
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenService {
    /// Build from configuration. Fails if a signing key is missing.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        if config.access_token_secret.is_empty() || config.refresh_token_secret.is_empty() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Token signing keys are not configured"
            )));
        }
        if config.access_token_ttl_minutes <= 0 || config.refresh_token_ttl_days <= 0 {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Token lifetimes must be positive"
            )));
        }
        let access_ttl_secs = ttl_secs(config.access_token_ttl_minutes, 60)?;
        let refresh_ttl_secs = ttl_secs(config.refresh_token_ttl_days, 24 * 60 * 60)?;
        // Catch lifetimes whose expiry cannot be represented now, not at first login.
        expires_at(unix_now(), access_ttl_secs.max(refresh_ttl_secs))?;

        Ok(Self {
            access_encoding: EncodingKey::from_secret(&config.access_token_secret),
            access_decoding: DecodingKey::from_secret(&config.access_token_secret),
            refresh_encoding: EncodingKey::from_secret(&config.refresh_token_secret),
            refresh_decoding: DecodingKey::from_secret(&config.refresh_token_secret),
            access_ttl_secs,
            refresh_ttl_secs,
        })
    }

    /// Access token lifetime in seconds (also used as cookie max-age).
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    /// Refresh token lifetime in seconds.
    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl_secs
    }

    /// Sign a new access/refresh pair for `user`.
    ///
    /// Persisting the refresh token is the caller's job.
    pub fn issue_tokens(&self, user: &UserRecord) -> Result<TokenPair, AppError> {
        let now = unix_now();
        let access_exp = expires_at(now, self.access_ttl_secs)?;
        let refresh_exp = expires_at(now, self.refresh_ttl_secs)?;

        let access = AccessClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            user_name: user.user_name.clone(),
            full_name: user.full_name.clone(),
            iat: now,
            exp: access_exp,
        };
        let refresh = RefreshClaims {
            sub: user.id.clone(),
            jti: random_token_id()?,
            iat: now,
            exp: refresh_exp,
        };

        let header = Header::new(Algorithm::HS256);
        let access_token = encode(&header, &access, &self.access_encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;
        let refresh_token = encode(&header, &refresh, &self.refresh_encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verify an access token's signature and expiry.
    pub fn decode_access(&self, token: &str) -> Result<AccessClaims, TokenRejection> {
        Ok(decode::<AccessClaims>(token, &self.access_decoding, &validation())?.claims)
    }

    /// Verify a refresh token's signature and expiry.
    ///
    /// This does not consult stored state; see `SessionService` for the
    /// replay check.
    pub fn decode_refresh(&self, token: &str) -> Result<RefreshClaims, TokenRejection> {
        Ok(decode::<RefreshClaims>(token, &self.refresh_decoding, &validation())?.claims)
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp", "sub"]);
    validation
}

fn random_token_id() -> Result<String, AppError> {
    let mut bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG unavailable")))?;
    Ok(hex::encode(bytes))
}

/// Lifetime in seconds, rejecting values that overflow.
fn ttl_secs(amount: i64, unit_secs: i64) -> Result<i64, AppError> {
    amount
        .checked_mul(unit_secs)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Token lifetime is too large")))
}

fn expires_at(now: i64, ttl_secs: i64) -> Result<i64, AppError> {
    now.checked_add(ttl_secs)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Token expiry is out of range")))
}

/// Digest persisted in place of the raw refresh token.
pub fn refresh_token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Constant-time comparison of a presented token against a stored digest.
pub fn digest_matches(stored_digest: &str, presented_token: &str) -> bool {
    let presented = refresh_token_digest(presented_token);
    stored_digest.as_bytes().ct_eq(presented.as_bytes()).into()
}
