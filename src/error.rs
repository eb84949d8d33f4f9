//! Error types for the preview service

use thiserror::Error;

/// Result type alias for preview operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while producing a preview
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Page fetch error (blocked host, bad status, non-text body)
    #[error("fetch error: {0}")]
    Fetch(String),

    /// URL could not be parsed
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
