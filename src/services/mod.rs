// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod accounts;
pub mod media;
pub mod password;
pub mod session;
pub mod tokens;

pub use accounts::{AccountService, ImageSlot, RegisterUser, UpdateAccountRequest};
pub use media::{CloudinaryMedia, MediaStore, UploadedFile};
pub use session::{ChangePasswordRequest, LoginOutcome, LoginRequest, SessionService};
pub use tokens::{TokenPair, TokenRejection, TokenService};
