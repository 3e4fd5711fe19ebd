// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image uploads to the external media host.
//!
//! Uses Cloudinary's signed upload API. Signatures default to SHA-1, the
//! Cloudinary default. Accounts switched to SHA-256 signing set
//! `CLOUDINARY_SIGNATURE_ALGORITHM=sha256`.

use crate::config::{MediaConfig, SignatureAlgorithm};
use crate::error::AppError;
use crate::time_utils::unix_now;
use async_trait::async_trait;
use axum::body::Bytes;
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// A file received from a multipart form, held in memory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Stores an image and returns its public URL.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, file: UploadedFile) -> Result<String, AppError>;
}

/// Cloudinary upload client.
#[derive(Clone)]
pub struct CloudinaryMedia {
    config: MediaConfig,
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(default)]
    secure_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl CloudinaryMedia {
    const API_BASE: &'static str = "https://api.cloudinary.com/v1_1";

    pub fn new(config: MediaConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            base_url: Self::API_BASE.to_string(),
        }
    }

    /// Point the client at a different API host (test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn is_configured(&self) -> bool {
        !self.config.cloud_name.is_empty()
            && !self.config.api_key.is_empty()
            && !self.config.api_secret.is_empty()
    }
}

/// Signature over the signed upload parameters (only `timestamp` here).
fn upload_signature(algorithm: SignatureAlgorithm, timestamp: i64, api_secret: &str) -> String {
    let payload = format!("timestamp={}{}", timestamp, api_secret);
    match algorithm {
        SignatureAlgorithm::Sha1 => hex::encode(
            ring::digest::digest(&ring::digest::SHA1_FOR_LEGACY_USE_ONLY, payload.as_bytes())
                .as_ref(),
        ),
        SignatureAlgorithm::Sha256 => hex::encode(Sha256::digest(payload.as_bytes())),
    }
}

#[async_trait]
impl MediaStore for CloudinaryMedia {
    async fn upload(&self, file: UploadedFile) -> Result<String, AppError> {
        if !self.is_configured() {
            return Err(AppError::UpstreamFailure(
                "Media host credentials are not configured".to_string(),
            ));
        }

        let timestamp = unix_now();
        let signature = upload_signature(
            self.config.signature_algorithm,
            timestamp,
            &self.config.api_secret,
        );

        let mut part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type).map_err(|e| {
                AppError::BadRequest(format!("Invalid content type for upload: {}", e))
            })?;
        }

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("signature", signature);

        let url = format!(
            "{}/{}/auto/upload",
            self.base_url, self.config.cloud_name
        );

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("Upload request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Media host rejected upload");
            return Err(AppError::UpstreamFailure(format!(
                "Media host returned {}",
                status
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("Bad upload response: {}", e)))?;

        let public_url = uploaded
            .secure_url
            .or(uploaded.url)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                AppError::UpstreamFailure("Media host returned no URL".to_string())
            })?;

        tracing::info!(file = %file.file_name, url = %public_url, "Image uploaded");
        Ok(public_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_signature_is_stable_hex() {
        for (algorithm, len) in [
            (SignatureAlgorithm::Sha1, 40),
            (SignatureAlgorithm::Sha256, 64),
        ] {
            let a = upload_signature(algorithm, 1_700_000_000, "secret");
            let b = upload_signature(algorithm, 1_700_000_000, "secret");
            assert_eq!(a, b);
            assert_eq!(a.len(), len);
            assert_ne!(a, upload_signature(algorithm, 1_700_000_001, "secret"));
        }
    }

    #[test]
    fn test_signature_digests_params_then_secret() {
        // Digests of "timestamp=1315060510abcd".
        assert_eq!(
            upload_signature(SignatureAlgorithm::default(), 1_315_060_510, "abcd"),
            "a21ad0f63beb4de2e5575204b79ab90bffb02c10"
        );
        assert_eq!(
            upload_signature(SignatureAlgorithm::Sha256, 1_315_060_510, "abcd"),
            "5652e549a70bdc03f73a633a23b7d3f3b067d72fff26dd15b25997f46fdf6439"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_upload_is_upstream_failure() {
        let media = CloudinaryMedia::new(MediaConfig::default());
        let result = media
            .upload(UploadedFile {
                file_name: "a.png".to_string(),
                content_type: Some("image/png".to_string()),
                bytes: Bytes::from_static(b"\x89PNG"),
            })
            .await;
        assert!(matches!(result, Err(AppError::UpstreamFailure(_))));
    }
}
