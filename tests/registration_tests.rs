// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration tests.
//!
//! A registration either creates exactly one user or leaves the store
//! untouched.

use axum::http::StatusCode;
use tower::ServiceExt;
use vidhub_accounts::db::UserStore;

mod common;
use common::{body_json, multipart_request, seed_user, FilePart};

const REGISTER: &str = "/api/v1/users/register";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake image";

fn valid_fields<'a>() -> Vec<(&'a str, &'a str)> {
    vec![
        ("fullName", "  Alice Liddell "),
        ("email", "Alice@Example.com"),
        ("userName", "Alice"),
        ("password", "s3cret-pass"),
    ]
}

fn avatar() -> FilePart<'static> {
    FilePart {
        field: "avatar",
        file_name: "me.png",
        bytes: PNG,
    }
}

fn cover() -> FilePart<'static> {
    FilePart {
        field: "coverImage",
        file_name: "banner.png",
        bytes: PNG,
    }
}

#[tokio::test]
async fn test_register_success() {
    let app = common::create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(multipart_request(
            "POST",
            REGISTER,
            &valid_fields(),
            &[avatar(), cover()],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["statusCode"], 201);
    assert_eq!(body["success"], true);

    let user = &body["data"];
    assert_eq!(user["fullName"], "Alice Liddell");
    assert_eq!(user["email"], "alice@example.com");
    assert_eq!(user["userName"], "alice");
    assert_eq!(user["avatar"], "https://media.test/1/me.png");
    assert_eq!(user["coverImage"], "https://media.test/2/banner.png");
    assert!(user.get("password").is_none());
    assert!(user.get("refreshToken").is_none());

    let stored = app
        .store
        .find_by_id(user["id"].as_str().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(stored.password.starts_with("$argon2id$"));
    assert!(stored.refresh_token.is_none());
}

#[tokio::test]
async fn test_register_without_cover_image() {
    let app = common::create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(multipart_request("POST", REGISTER, &valid_fields(), &[avatar()]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert!(body["data"]["coverImage"].is_null());
    assert_eq!(app.media.upload_count(), 1);
}

#[tokio::test]
async fn test_register_blank_field_creates_nothing() {
    let app = common::create_test_app();
    let fields = vec![
        ("fullName", "Alice"),
        ("email", "alice@example.com"),
        ("userName", "   "),
        ("password", "s3cret-pass"),
    ];

    let response = app
        .router
        .clone()
        .oneshot(multipart_request("POST", REGISTER, &fields, &[avatar()]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"][0]["field"], "userName");

    assert!(app.store.is_empty());
    assert_eq!(app.media.upload_count(), 0);
}

#[tokio::test]
async fn test_register_reports_every_missing_field() {
    let app = common::create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(multipart_request(
            "POST",
            REGISTER,
            &[("fullName", ""), ("email", ""), ("userName", " "), ("password", "")],
            &[],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    for expected in ["avatar", "email", "fullName", "password", "userName"] {
        assert!(fields.contains(&expected), "missing {expected} in {fields:?}");
    }
}

#[tokio::test]
async fn test_register_trims_padded_email() {
    let app = common::create_test_app();
    let fields = vec![
        ("fullName", "  Alice "),
        ("email", " alice@example.com "),
        ("userName", " alice "),
        ("password", "s3cret-pass"),
    ];

    let response = app
        .router
        .clone()
        .oneshot(multipart_request("POST", REGISTER, &fields, &[avatar()]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let stored = app
        .store
        .find_by_id(body["data"]["id"].as_str().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.email, "alice@example.com");
    assert_eq!(stored.user_name, "alice");
    assert_eq!(stored.full_name, "Alice");
}

#[tokio::test]
async fn test_register_missing_avatar_creates_nothing() {
    let app = common::create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(multipart_request("POST", REGISTER, &valid_fields(), &[cover()]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["errors"][0]["field"], "avatar");
    assert!(app.store.is_empty());
    assert_eq!(app.media.upload_count(), 0);
}

#[tokio::test]
async fn test_register_empty_avatar_part_counts_as_missing() {
    let app = common::create_test_app();
    let empty = FilePart {
        field: "avatar",
        file_name: "",
        bytes: b"",
    };

    let response = app
        .router
        .clone()
        .oneshot(multipart_request("POST", REGISTER, &valid_fields(), &[empty]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_register_rejects_invalid_email() {
    let app = common::create_test_app();
    let fields = vec![
        ("fullName", "Alice"),
        ("email", "not-an-email"),
        ("userName", "alice"),
        ("password", "s3cret-pass"),
    ];

    let response = app
        .router
        .clone()
        .oneshot(multipart_request("POST", REGISTER, &fields, &[avatar()]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["errors"][0]["field"], "email");
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_register_duplicate_user_name_conflicts() {
    let app = common::create_test_app();
    seed_user(&app.store, "alice", "someone-else@example.com").await;

    let response = app
        .router
        .clone()
        .oneshot(multipart_request("POST", REGISTER, &valid_fields(), &[avatar()]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(app.store.len(), 1);
    assert_eq!(app.media.upload_count(), 0);
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = common::create_test_app();
    seed_user(&app.store, "someone-else", "alice@example.com").await;

    let response = app
        .router
        .clone()
        .oneshot(multipart_request("POST", REGISTER, &valid_fields(), &[avatar()]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(app.store.len(), 1);
}

#[tokio::test]
async fn test_register_upload_failure_creates_nothing() {
    let (router, store) = common::create_test_app_with_failing_media();

    let response = router
        .oneshot(multipart_request("POST", REGISTER, &valid_fields(), &[avatar()]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "upload_failed");
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_register_rejects_two_avatars() {
    let app = common::create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(multipart_request(
            "POST",
            REGISTER,
            &valid_fields(),
            &[avatar(), avatar()],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_register_rejects_json_body() {
    let app = common::create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(common::json_request(
            "POST",
            REGISTER,
            serde_json::json!({ "userName": "alice" }),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
