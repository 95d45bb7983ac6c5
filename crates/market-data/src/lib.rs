//! Coinfolio Market Data Crate
//!
//! Crypto price data for the Coinfolio portfolio engine, built around a
//! single upstream API (CoinGecko) whose free tier tolerates very few calls.
//!
//! # Overview
//!
//! The crate supports:
//! - Top-asset listings, spot prices, asset details, historical series
//! - A rolling call budget (few calls per multi-hour window, minimum
//!   spacing, HTTP 429 fast-forwards exhaustion)
//! - A persisted price cache whose TTL stretches while rate limited
//! - A static baseline dataset as the absolute last resort
//!
//! # Architecture
//!
//! ```text
//! +-------------------+
//! | MarketDataService |  (cache-first orchestration)
//! +-------------------+
//!    |        |      \
//!    v        v       v
//! +-------+ +------+ +--------------+
//! | Cache | |Budget| | PriceProvider|  (CoinGecko)
//! +-------+ +------+ +--------------+
//!    |
//!    v
//! +------------+
//! | CacheStore |  (persistence seam)
//! +------------+
//! ```
//!
//! Every read walks the same ladder: fresh cache, budgeted network call,
//! stale cache, baseline dataset. Consumers that must never trigger network
//! traffic use [`MarketDataServiceTrait::cached_price`] and
//! [`MarketDataServiceTrait::is_rate_limited`].

pub mod budget;
pub mod cache;
pub mod errors;
pub mod models;
pub mod provider;
pub mod service;

// Re-export the public surface
pub use budget::{BudgetStatus, CallBudget, CallBudgetConfig};
pub use cache::{
    CacheConfig, CacheStore, CachedPrice, MemoryCacheStore, PriceCache, PriceCacheSnapshot,
};
pub use errors::MarketDataError;
pub use models::{MarketAsset, PricePoint};
pub use provider::{
    baseline_assets, baseline_price, CoinGeckoConfig, CoinGeckoProvider, PriceProvider,
};
pub use service::{MarketDataService, MarketDataServiceTrait};
