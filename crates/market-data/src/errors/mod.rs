//! Error types for the market data crate.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during market data operations.
///
/// The service layer treats most of these as soft failures and falls back to
/// cached or baseline data; callers that need to distinguish rate limiting
/// from other failures can use [`is_rate_limit`](Self::is_rate_limit).
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The requested asset is unknown to the provider and to every fallback.
    /// This is a terminal error - retrying won't help.
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// The upstream API rejected the request with HTTP 429.
    /// The local call budget is fast-forwarded to exhaustion when this occurs.
    #[error("Rate limited by provider")]
    RateLimited,

    /// The local call budget is spent for the current window.
    /// No request was made; callers should use cached or baseline data.
    #[error("Call budget exhausted until {until}")]
    BudgetExhausted {
        /// When the rolling window frees up again.
        until: DateTime<Utc>,
    },

    /// The request to the provider timed out.
    #[error("Request timed out")]
    Timeout,

    /// The provider returned a non-success status or an API-level error.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The provider responded but the payload could not be interpreted.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// No cached entry exists for the requested asset.
    #[error("No cached data for asset: {0}")]
    CacheMiss(String),

    /// A network error occurred while communicating with the provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// True when the error means the provider must not be called again soon,
    /// either because it said so (429) or because the local budget is spent.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited | Self::BudgetExhausted { .. })
    }
}
