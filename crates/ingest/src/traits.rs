use async_trait::async_trait;
use thiserror::Error;

use openfda_core::{QueryWindow, WeeklyColumns};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response body: {0}")]
    Decode(String),

    #[error("Unparsable report date {0:?}")]
    InvalidDate(String),
}

/// Source of weekly aggregates for one query window.
///
/// A non-200 answer from the upstream API is not an error: implementations
/// return an empty [`WeeklyColumns`] instead.
#[async_trait]
pub trait WeeklySource: Send + Sync {
    async fn fetch_weekly(&self, window: QueryWindow) -> Result<WeeklyColumns, FetchError>;

    /// Human-readable name for logs.
    fn source_name(&self) -> &str;
}
