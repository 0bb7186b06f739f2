//! Fatal error type for the public API
//!
//! Provider failures are not errors at this level: they are recorded as
//! [`SourceStatus`](crate::results::SourceStatus) entries in the session's
//! source stats and never fail a search.

use thiserror::Error;

/// Errors returned synchronously by [`SearchEngine`](crate::search::SearchEngine)
/// entry points, before any session work starts.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Rejected configuration, e.g. a non-positive timeout or concurrency
    /// cap, or an empty provider id at registration time.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl SearchError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
