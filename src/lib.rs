// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Vidhub accounts: user registration, login, and JWT session management
//!
//! This crate provides the backend API for user accounts of a video-sharing
//! site: sign-up with avatar upload, access/refresh token issuance and
//! rotation, and profile maintenance.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;
pub mod validation;

use config::Config;
use db::UserStore;
use error::AppError;
use services::{AccountService, MediaStore, SessionService, TokenService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub sessions: SessionService,
    pub accounts: AccountService,
}

impl AppState {
    /// Wire services over an injected store and media host.
    pub fn new(
        config: Config,
        store: Arc<dyn UserStore>,
        media: Arc<dyn MediaStore>,
    ) -> Result<Self, AppError> {
        let tokens = TokenService::new(&config)?;
        Ok(Self {
            sessions: SessionService::new(store.clone(), tokens),
            accounts: AccountService::new(store, media),
            config,
        })
    }
}
