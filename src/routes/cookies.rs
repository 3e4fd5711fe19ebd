// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth cookie construction.
//!
//! Removal cookies carry the same attributes as the cookies they replace,
//! otherwise browsers treat them as different cookies and keep the old one.

use crate::services::TokenPair;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

fn auth_cookie(name: &'static str, value: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

/// Set both token cookies.
pub fn with_token_cookies(
    jar: CookieJar,
    tokens: &TokenPair,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    secure: bool,
) -> CookieJar {
    jar.add(auth_cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access_token.clone(),
        access_ttl_secs,
        secure,
    ))
    .add(auth_cookie(
        REFRESH_TOKEN_COOKIE,
        tokens.refresh_token.clone(),
        refresh_ttl_secs,
        secure,
    ))
}

/// Expire both token cookies, whether or not the request carried them.
pub fn without_token_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(auth_cookie(ACCESS_TOKEN_COOKIE, String::new(), 0, secure))
        .add(auth_cookie(REFRESH_TOKEN_COOKIE, String::new(), 0, secure))
}
