//! Feed error type.

use thiserror::Error;

/// Errors produced while fetching or decoding a snapshot.
///
/// A parse failure is handled exactly like a transport failure by the polling
/// loop: the cycle is skipped and no state changes.
#[derive(Debug, Clone, Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("feed answered with HTTP status {0}")]
    Status(u16),

    #[error("malformed feed payload: {0}")]
    Parse(String),
}

impl FeedError {
    pub fn is_parse(&self) -> bool {
        matches!(self, FeedError::Parse(_))
    }
}

pub type FeedResult<T> = Result<T, FeedError>;
