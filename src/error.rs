use axum::http::StatusCode;
use thiserror::Error;

/// Failure talking to the initiatives backend.
///
/// Kept distinct from an empty result: "not found" comes back as `Ok(vec![])`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend returned HTTP {status} for {path}")]
    Status { status: u16, path: String },

    #[error("Invalid response body from {path}: {message}")]
    Decode { path: String, message: String },
}

impl FetchError {
    /// Status the HTTP surface answers with when a backend call fails.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_GATEWAY
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Initiative {0} is awaiting approval")]
    AwaitingApproval(i64),
}
