// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process credential store.
//!
//! Used by tests and by `STORE_BACKEND=memory` local runs. Uniqueness of
//! email and username is enforced under a single write lock, taken by
//! inserts and by email changes, so two concurrent writers cannot both
//! claim the same address.

use crate::db::{new_user_id, UserStore};
use crate::error::AppError;
use crate::models::{NewUser, UserRecord, UserUpdate};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// DashMap-backed [`UserStore`].
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<DashMap<String, UserRecord>>,
    write_lock: Arc<Mutex<()>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn find_matching(&self, email: Option<&str>, user_name: Option<&str>) -> Option<UserRecord> {
        self.users
            .iter()
            .find(|entry| {
                let user = entry.value();
                email.is_some_and(|e| user.email == e)
                    || user_name.is_some_and(|u| user.user_name == u)
            })
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, AppError> {
        Ok(self.users.get(user_id).map(|entry| entry.value().clone()))
    }

    async fn find_by_email_or_user_name(
        &self,
        email: Option<&str>,
        user_name: Option<&str>,
    ) -> Result<Option<UserRecord>, AppError> {
        Ok(self.find_matching(email, user_name))
    }

    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, AppError> {
        let _guard = self.write_lock.lock().await;

        if self
            .find_matching(Some(&user.email), Some(&user.user_name))
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

        self.users.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update_user(
        &self,
        user_id: &str,
        update: UserUpdate,
    ) -> Result<Option<UserRecord>, AppError> {
        // Held until the update lands so the uniqueness check stays valid.
        let _guard = match update.email {
            Some(_) => Some(self.write_lock.lock().await),
            None => None,
        };

        if let Some(email) = update.email.as_deref() {
            // Scan before get_mut: iterating while holding a shard write
            // guard would deadlock.
            let taken = self
                .find_matching(Some(email), None)
                .is_some_and(|other| other.id != user_id);
            if taken {
                return Err(AppError::Conflict(
                    "Email is already used by another account".to_string(),
                ));
            }
        }

        let now = format_utc_rfc3339(chrono::Utc::now());
        Ok(self.users.get_mut(user_id).map(|mut entry| {
            update.apply(entry.value_mut(), &now);
            entry.value().clone()
        }))
    }

    async fn set_refresh_token(
        &self,
        user_id: &str,
        token_digest: Option<&str>,
    ) -> Result<bool, AppError> {
        match self.users.get_mut(user_id) {
            Some(mut entry) => {
                entry.value_mut().refresh_token = token_digest.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
