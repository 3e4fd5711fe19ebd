// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User account routes under `/api/v1/users`.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::PublicUser;
use crate::routes::cookies::{with_token_cookies, without_token_cookies, REFRESH_TOKEN_COOKIE};
use crate::routes::{respond, ApiResponse};
use crate::services::{
    ChangePasswordRequest, ImageSlot, LoginOutcome, LoginRequest, RegisterUser, TokenPair,
    UpdateAccountRequest, UploadedFile,
};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::JsonRejection,
        State,
    },
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

/// Routes that do not need an access token.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
}

/// Routes behind `require_auth` (layer applied in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/current-user", get(current_user))
        .route("/update-account", patch(update_account))
        .route("/avatar", patch(update_avatar))
        .route("/cover-image", patch(update_cover_image))
}

// ─── Multipart ───────────────────────────────────────────────

/// Text fields and files of a multipart form.
#[derive(Default)]
struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl FormData {
    fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

/// Buffer a multipart body, accepting at most one file per allowed field.
async fn read_form(
    multipart: std::result::Result<Multipart, MultipartRejection>,
    file_fields: &[&str],
) -> Result<FormData> {
    let mut multipart =
        multipart.map_err(|e| AppError::BadRequest(format!("Expected multipart form: {}", e)))?;
    let mut form = FormData::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                if !file_fields.contains(&name.as_str()) {
                    return Err(AppError::BadRequest(format!("Unexpected file field '{}'", name)));
                }
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;

                // Browsers send an empty part when no file was chosen.
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                if form.files.contains_key(&name) {
                    return Err(AppError::invalid_field(&name, "Only one file is allowed"));
                }
                form.files.insert(
                    name,
                    UploadedFile {
                        file_name,
                        content_type,
                        bytes,
                    },
                );
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read field: {}", e)))?;
                form.fields.entry(name).or_insert(value);
            }
        }
    }

    Ok(form)
}

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

// ─── Registration ────────────────────────────────────────────

async fn register(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Reply<PublicUser>> {
    let mut form = read_form(multipart, &["avatar", "coverImage"]).await?;

    let input = RegisterUser {
        full_name: form.text("fullName"),
        email: form.text("email"),
        user_name: form.text("userName"),
        password: form.text("password"),
    };
    let avatar = form.take_file("avatar");
    let cover_image = form.take_file("coverImage");

    let user = state.accounts.register(input, avatar, cover_image).await?;

    Ok(respond(
        StatusCode::CREATED,
        user,
        "User registered successfully",
    ))
}

// ─── Session ─────────────────────────────────────────────────

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Reply<LoginOutcome>)> {
    let request = json_body(payload)?;
    let outcome = state.sessions.login(&request).await?;

    let tokens = state.sessions.tokens();
    let jar = with_token_cookies(
        jar,
        &outcome.tokens,
        tokens.access_ttl_secs(),
        tokens.refresh_ttl_secs(),
        state.config.secure_cookies,
    );

    Ok((
        jar,
        respond(StatusCode::OK, outcome, "User logged in successfully"),
    ))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Reply<serde_json::Value>)> {
    state.sessions.logout(&auth.user_id).await?;

    let jar = without_token_cookies(jar, state.config.secure_cookies);
    Ok((
        jar,
        respond(StatusCode::OK, serde_json::json!({}), "User logged out"),
    ))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Prefer the cookie; fall back to a JSON body `{ "refreshToken": ... }`.
fn presented_refresh_token(jar: &CookieJar, body: &[u8]) -> Option<String> {
    if let Some(cookie) = jar.get(REFRESH_TOKEN_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    if body.is_empty() {
        return None;
    }
    serde_json::from_slice::<RefreshRequest>(body)
        .ok()
        .and_then(|r| r.refresh_token)
        .filter(|t| !t.trim().is_empty())
}

async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Reply<TokenPair>)> {
    let presented = presented_refresh_token(&jar, &body).ok_or(AppError::InvalidToken)?;
    let pair = state.sessions.refresh(&presented).await?;

    let tokens = state.sessions.tokens();
    let jar = with_token_cookies(
        jar,
        &pair,
        tokens.access_ttl_secs(),
        tokens.refresh_ttl_secs(),
        state.config.secure_cookies,
    );

    Ok((jar, respond(StatusCode::OK, pair, "Access token refreshed")))
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    payload: std::result::Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Reply<serde_json::Value>> {
    let request = json_body(payload)?;
    state
        .sessions
        .change_password(&auth.user_id, &request)
        .await?;

    Ok(respond(
        StatusCode::OK,
        serde_json::json!({}),
        "Password changed successfully",
    ))
}

// ─── Profile ─────────────────────────────────────────────────

async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Reply<PublicUser>> {
    let user = state.accounts.current_user(&auth.user_id).await?;
    Ok(respond(StatusCode::OK, user, "Current user fetched"))
}

async fn update_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    payload: std::result::Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> Result<Reply<PublicUser>> {
    let request = json_body(payload)?;
    let user = state
        .accounts
        .update_account_details(&auth.user_id, &request)
        .await?;
    Ok(respond(
        StatusCode::OK,
        user,
        "Account details updated successfully",
    ))
}

async fn update_image(
    state: &AppState,
    auth: &AuthUser,
    slot: ImageSlot,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<PublicUser> {
    let field = slot.field_name();
    let mut form = read_form(multipart, &[field]).await?;
    state
        .accounts
        .update_image(&auth.user_id, slot, form.take_file(field))
        .await
}

async fn update_avatar(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Reply<PublicUser>> {
    let user = update_image(&state, &auth, ImageSlot::Avatar, multipart).await?;
    Ok(respond(StatusCode::OK, user, "Avatar updated successfully"))
}

async fn update_cover_image(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Reply<PublicUser>> {
    let user = update_image(&state, &auth, ImageSlot::CoverImage, multipart).await?;
    Ok(respond(
        StatusCode::OK,
        user,
        "Cover image updated successfully",
    ))
}
