//! Error types for Sift

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// The transaction service answered with a non-success status
    #[error("Service returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Request rejected locally before it was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The progress stream failed as a whole (not a single malformed line)
    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
