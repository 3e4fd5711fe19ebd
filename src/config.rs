//! Application configuration loaded from environment variables.
//!
//! Secrets are injected as environment variables by the deployment (or a
//! local `.env` file) and read once at startup.

use std::env;

/// Which credential store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Google Cloud Firestore (or its emulator).
    Firestore,
    /// In-process store; state is lost on restart.
    Memory,
}

/// Digest used to sign media uploads. Must match the media account's setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    /// Cloudinary's default for new accounts.
    #[default]
    Sha1,
    Sha256,
}

impl SignatureAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

impl std::str::FromStr for SignatureAlgorithm {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            _ => Err(()),
        }
    }
}

/// Cloudinary-style media host credentials.
#[derive(Debug, Clone, Default)]
pub struct MediaConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub signature_algorithm: SignatureAlgorithm,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Allowed CORS origin for the frontend
    pub cors_origin: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Credential store selection
    pub store_backend: StoreBackend,
    /// Access token lifetime in minutes
    pub access_token_ttl_minutes: i64,
    /// Refresh token lifetime in days
    pub refresh_token_ttl_days: i64,
    /// Largest accepted request body (multipart uploads included)
    pub max_upload_bytes: usize,
    /// Mark auth cookies `Secure`
    pub secure_cookies: bool,

    // --- Secrets ---
    /// HS256 key for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// HS256 key for refresh tokens (raw bytes)
    pub refresh_token_secret: Vec<u8>,
    /// Media host credentials
    pub media: MediaConfig,
}

impl Config {
    /// Config for tests: in-memory store, fixed secrets.
    pub fn test_default() -> Self {
        Self {
            cors_origin: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8000,
            store_backend: StoreBackend::Memory,
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 10,
            max_upload_bytes: 1024 * 1024,
            secure_cookies: true,
            access_token_secret: b"test_access_key_32_bytes_minimum".to_vec(),
            refresh_token_secret: b"test_refresh_key_32_bytes_minimum".to_vec(),
            media: MediaConfig {
                cloud_name: "test-cloud".to_string(),
                api_key: "test_api_key".to_string(),
                api_secret: "test_api_secret".to_string(),
                signature_algorithm: SignatureAlgorithm::Sha1,
            },
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let cors_origin =
            env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string());

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "firestore" => StoreBackend::Firestore,
            "memory" => StoreBackend::Memory,
            _ => return Err(ConfigError::Invalid("STORE_BACKEND")),
        };

        // Cookies stay `Secure` unless explicitly disabled for plain-http development.
        let secure_cookies = match env::var("COOKIE_SECURE") {
            Ok(v) => v.trim() != "false",
            Err(_) => true,
        };

        let access_token_secret = required_secret("ACCESS_TOKEN_SECRET")?;
        let refresh_token_secret = required_secret("REFRESH_TOKEN_SECRET")?;
        if access_token_secret == refresh_token_secret {
            return Err(ConfigError::Invalid("REFRESH_TOKEN_SECRET"));
        }

        Ok(Self {
            cors_origin,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: parse_or("PORT", 8000)?,
            store_backend,
            access_token_ttl_minutes: parse_or("ACCESS_TOKEN_EXPIRY_MINUTES", 15)?,
            refresh_token_ttl_days: parse_or("REFRESH_TOKEN_EXPIRY_DAYS", 10)?,
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            secure_cookies,
            access_token_secret,
            refresh_token_secret,
            media: MediaConfig {
                cloud_name: env::var("CLOUDINARY_CLOUD_NAME").unwrap_or_default(),
                api_key: env::var("CLOUDINARY_API_KEY").unwrap_or_default(),
                api_secret: env::var("CLOUDINARY_API_SECRET")
                    .map(|v| v.trim().to_string())
                    .unwrap_or_default(),
                signature_algorithm: parse_or(
                    "CLOUDINARY_SIGNATURE_ALGORITHM",
                    SignatureAlgorithm::Sha1,
                )?,
            },
        })
    }
}

fn required_secret(name: &'static str) -> Result<Vec<u8>, ConfigError> {
    let value = env::var(name).map_err(|_| ConfigError::Missing(name))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(value.as_bytes().to_vec())
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
