// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vidhub_accounts::config::Config;
use vidhub_accounts::db::{FirestoreDb, MemoryUserStore, UserStore};
use vidhub_accounts::error::AppError;
use vidhub_accounts::models::{NewUser, UserRecord};
use vidhub_accounts::routes::create_router;
use vidhub_accounts::services::password::hash_password;
use vidhub_accounts::services::{MediaStore, UploadedFile};
use vidhub_accounts::AppState;

#[allow(dead_code)]
pub const TEST_PASSWORD: &str = "correct horse battery staple";
#[allow(dead_code)]
pub const BOUNDARY: &str = "vidhub-test-boundary";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Media host that hands out predictable URLs and counts uploads.
#[derive(Default)]
pub struct StaticMedia {
    uploads: AtomicUsize,
}

impl StaticMedia {
    #[allow(dead_code)]
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaStore for StaticMedia {
    async fn upload(&self, file: UploadedFile) -> Result<String, AppError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("https://media.test/{}/{}", n, file.file_name))
    }
}

/// Media host that is always down.
#[allow(dead_code)]
pub struct FailingMedia;

#[async_trait]
impl MediaStore for FailingMedia {
    async fn upload(&self, _file: UploadedFile) -> Result<String, AppError> {
        Err(AppError::UpstreamFailure("media host unavailable".to_string()))
    }
}

/// Handles to everything a test may want to inspect.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: MemoryUserStore,
    pub media: Arc<StaticMedia>,
}

/// Create a test app over the in-memory store and a fake media host.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let store = MemoryUserStore::new();
    let media = Arc::new(StaticMedia::default());
    let state = Arc::new(
        AppState::new(
            Config::test_default(),
            Arc::new(store.clone()),
            media.clone(),
        )
        .expect("test state"),
    );

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        media,
    }
}

/// Create a test app whose media uploads always fail.
#[allow(dead_code)]
pub fn create_test_app_with_failing_media() -> (axum::Router, MemoryUserStore) {
    let store = MemoryUserStore::new();
    let state = Arc::new(
        AppState::new(
            Config::test_default(),
            Arc::new(store.clone()),
            Arc::new(FailingMedia),
        )
        .expect("test state"),
    );
    (create_router(state), store)
}

/// Insert a user directly, bypassing registration.
#[allow(dead_code)]
pub async fn seed_user(store: &MemoryUserStore, user_name: &str, email: &str) -> UserRecord {
    store
        .insert_user(NewUser {
            full_name: "Test User".to_string(),
            email: email.to_string(),
            user_name: user_name.to_string(),
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            avatar: "https://media.test/avatar.png".to_string(),
            cover_image: None,
        })
        .await
        .unwrap()
}

/// A file part for [`multipart_request`].
#[allow(dead_code)]
pub struct FilePart<'a> {
    pub field: &'a str,
    pub file_name: &'a str,
    pub bytes: &'a [u8],
}

/// Build a multipart/form-data request by hand.
#[allow(dead_code)]
pub fn multipart_request(
    method: &str,
    uri: &str,
    fields: &[(&str, &str)],
    files: &[FilePart<'_>],
) -> Request<Body> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    for file in files {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                file.field, file.file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
        body.extend_from_slice(file.bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Build a JSON request, optionally carrying a Cookie header.
#[allow(dead_code)]
pub fn json_request(
    method: &str,
    uri: &str,
    body: serde_json::Value,
    cookie: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// Value part of a `Set-Cookie` header.
#[allow(dead_code)]
pub fn cookie_value(set_cookie: &str) -> String {
    let pair = set_cookie.split(';').next().unwrap_or_default();
    pair.split_once('=')
        .map(|(_, value)| value.to_string())
        .unwrap_or_default()
}

/// Log in through the API and return the response JSON `data`.
#[allow(dead_code)]
pub async fn login(router: &axum::Router, user_name: &str) -> serde_json::Value {
    use tower::ServiceExt;

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/users/login",
            serde_json::json!({ "userName": user_name, "password": TEST_PASSWORD }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    body_json(response).await["data"].clone()
}
