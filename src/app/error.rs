use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WarblerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Timed out after {0:?} waiting for data")]
    Timeout(Duration),

    #[error("Server returned HTTP {code}{}", body.as_deref().map(|b| format!(": {}", b)).unwrap_or_default())]
    Status { code: u16, body: Option<String> },

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid avatar URL: {0}")]
    InvalidAvatarUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Link shortening failed: {0}")]
    Shorten(String),

    #[error("Status is {count} characters, limit is {max}")]
    TooLong { count: usize, max: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl WarblerError {
    /// Transport and server-side failures that are worth retrying on the
    /// next tick. Parse and local errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            WarblerError::Http(_) | WarblerError::Timeout(_) => true,
            WarblerError::Status { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, WarblerError>;
