//! Error types for the caching policy engine.

use thiserror::Error;

/// Boxed error used for body streams and other opaque failure sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while driving a [`CachingPolicy`](crate::CachingPolicy).
///
/// These only signal a broken contract between the engine and its I/O
/// handler. Cache misses, stale entries and Vary mismatches are never errors.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The handler answered an action with a result of the wrong kind.
    #[error("Unexpected action result: expected {expected}, got {got}")]
    UnexpectedResult {
        /// Result kind the pending action expects.
        expected: &'static str,
        /// Result kind that was supplied.
        got: &'static str,
    },

    /// A deferred cache write did not hand the response back.
    #[error("Deferred cache write returned no response")]
    MissingResponse,

    /// A cached response must have a materialized body to be revalidated.
    #[error("Cached response body is not materialized")]
    NotMaterialized,

    /// The policy already produced its final response.
    #[error("Caching policy already finished")]
    Finished,
}

/// Cache entry encoding errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The entry could not be encoded.
    #[error("Encoding error: {0}")]
    Encode(String),
}
