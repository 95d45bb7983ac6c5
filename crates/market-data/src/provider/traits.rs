//! Price provider trait definition.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::errors::MarketDataError;
use crate::models::{MarketAsset, PricePoint};

/// Raw network layer for a crypto price API.
///
/// Implementations perform exactly one upstream request per call and map
/// HTTP 429 to [`MarketDataError::RateLimited`]. Budgeting, caching and
/// fallbacks live above this trait in the service layer.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Unique identifier for this provider, used in logging.
    fn id(&self) -> &'static str;

    /// Fetch the top assets by market cap, with current prices.
    async fn fetch_top_assets(&self, limit: usize) -> Result<Vec<MarketAsset>, MarketDataError>;

    /// Fetch the current spot price for one asset.
    async fn fetch_spot_price(&self, asset_id: &str) -> Result<Decimal, MarketDataError>;

    /// Fetch full listing details for one asset.
    async fn fetch_asset_details(&self, asset_id: &str) -> Result<MarketAsset, MarketDataError>;

    /// Fetch a historical price series covering the trailing `days` days.
    /// Points are ordered by timestamp ascending.
    async fn fetch_market_chart(
        &self,
        asset_id: &str,
        days: u32,
    ) -> Result<Vec<PricePoint>, MarketDataError>;
}
