//! Caching client error types.

use httpcache_core::{BoxError, CodecError, PolicyError};
use httpcache_store::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Result type for caching client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Caching client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The caching policy and its handler disagreed.
    #[error("Caching policy error: {0}")]
    Policy(#[from] PolicyError),

    /// The cache store failed.
    #[error("Cache store error: {0}")]
    Store(#[from] StoreError),

    /// A cache entry could not be encoded.
    #[error("Cache entry error: {0}")]
    Codec(#[from] CodecError),

    /// Underlying HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading a request or response body failed.
    #[error("Body error: {0}")]
    Body(BoxError),

    /// The request did not finish in time.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Request building error.
    #[error("Failed to build request: {0}")]
    RequestBuild(String),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl ClientError {
    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout(),
            Self::Timeout(_) | Self::Store(StoreError::Timeout) => true,
            Self::Body(e) => e
                .downcast_ref::<reqwest::Error>()
                .is_some_and(reqwest::Error::is_timeout),
            _ => false,
        }
    }

    /// Check if this is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_connect())
            || matches!(self, Self::Store(StoreError::Connection(_)))
    }

    /// Get the HTTP status code carried by the underlying client error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
