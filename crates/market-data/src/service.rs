//! Market data service: cache-first orchestration over the price provider.
//!
//! Every read walks the same ladder: fresh cache, then the network if the
//! call budget permits, then whatever stale cache exists, then the static
//! baseline dataset. An upstream 429 exhausts the budget for the rest of
//! its window, which also stretches cache TTLs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use rust_decimal::Decimal;

use crate::budget::{BudgetStatus, CallBudget, CallBudgetConfig};
use crate::cache::{CacheConfig, CacheStore, PriceCache};
use crate::errors::MarketDataError;
use crate::models::{MarketAsset, PricePoint};
use crate::provider::{baseline_assets, baseline_price, PriceProvider};

/// How many assets one listing fetch covers. Larger than typical display
/// limits so a single budgeted call serves wider follow-up queries.
const LISTING_FETCH_SIZE: usize = 50;

/// Read-side contract of the market data service.
#[async_trait]
pub trait MarketDataServiceTrait: Send + Sync {
    /// Top assets by market cap, truncated to `limit`.
    async fn list_top_assets(&self, limit: usize)
        -> Result<Vec<MarketAsset>, MarketDataError>;

    /// Current spot price for one asset.
    async fn get_current_price(&self, asset_id: &str) -> Result<Decimal, MarketDataError>;

    /// Listing details for one asset.
    async fn get_asset_details(&self, asset_id: &str) -> Result<MarketAsset, MarketDataError>;

    /// Filter the known asset listing by id, symbol or name.
    async fn search_assets(&self, query: &str) -> Result<Vec<MarketAsset>, MarketDataError>;

    /// Historical price series covering the trailing `days` days.
    async fn get_historical_series(
        &self,
        asset_id: &str,
        days: u32,
    ) -> Result<Vec<PricePoint>, MarketDataError>;

    /// Last cached price for an asset, regardless of age. Never touches the
    /// network.
    fn cached_price(&self, asset_id: &str) -> Option<Decimal>;

    /// Cached listing entry for an asset, regardless of age. Never touches
    /// the network.
    fn cached_asset(&self, asset_id: &str) -> Option<MarketAsset>;

    /// True while the call budget is exhausted for the current window.
    fn is_rate_limited(&self) -> bool;

    /// Drop all cached market data, including the persisted copy.
    async fn clear_cache(&self);
}

/// Budget- and cache-aware façade over a [`PriceProvider`].
pub struct MarketDataService {
    provider: Arc<dyn PriceProvider>,
    budget: CallBudget,
    cache: PriceCache,
    store: Arc<dyn CacheStore>,
}

impl MarketDataService {
    /// Build a service with default budget and cache settings, rehydrating
    /// the cache from `store`.
    pub async fn new(provider: Arc<dyn PriceProvider>, store: Arc<dyn CacheStore>) -> Self {
        Self::with_config(
            provider,
            store,
            CallBudgetConfig::default(),
            CacheConfig::default(),
        )
        .await
    }

    pub async fn with_config(
        provider: Arc<dyn PriceProvider>,
        store: Arc<dyn CacheStore>,
        budget_config: CallBudgetConfig,
        cache_config: CacheConfig,
    ) -> Self {
        let cache = PriceCache::new(cache_config);
        if let Some(snapshot) = store.load().await {
            debug!(
                "Rehydrated market cache: {} assets, {} prices",
                snapshot.assets.len(),
                snapshot.prices.len()
            );
            cache.restore(snapshot);
        }

        Self {
            provider,
            budget: CallBudget::new(budget_config),
            cache,
            store,
        }
    }

    /// Current budget counters and timings.
    pub fn budget_status(&self) -> BudgetStatus {
        self.budget.status(Utc::now())
    }

    async fn persist_cache(&self) {
        self.store.save(self.cache.snapshot()).await;
    }

    /// Spend one budgeted call on refreshing the asset listing.
    /// Returns the fresh list on success, `None` on any failure (logged).
    async fn refresh_listing(&self, limit: usize) -> Option<Vec<MarketAsset>> {
        let now = Utc::now();
        if !self.budget.try_acquire(now) {
            debug!("Listing refresh skipped: call budget denied");
            return None;
        }

        match self
            .provider
            .fetch_top_assets(limit.max(LISTING_FETCH_SIZE))
            .await
        {
            Ok(assets) => {
                self.cache.replace_assets(assets.clone(), Utc::now());
                self.persist_cache().await;
                Some(assets)
            }
            Err(e) => {
                if e.is_rate_limit() {
                    self.budget.note_rate_limited(Utc::now());
                }
                warn!("Listing refresh via {} failed: {}", self.provider.id(), e);
                None
            }
        }
    }

    fn truncated(mut assets: Vec<MarketAsset>, limit: usize) -> Vec<MarketAsset> {
        assets.truncate(limit);
        assets
    }
}

#[async_trait]
impl MarketDataServiceTrait for MarketDataService {
    async fn list_top_assets(
        &self,
        limit: usize,
    ) -> Result<Vec<MarketAsset>, MarketDataError> {
        let now = Utc::now();
        let limited = self.budget.is_exhausted(now);

        if let Some(assets) = self.cache.assets_if_fresh(now, limited) {
            return Ok(Self::truncated(assets, limit));
        }

        if let Some(assets) = self.refresh_listing(limit).await {
            return Ok(Self::truncated(assets, limit));
        }

        let stale = self.cache.assets_any_age();
        if !stale.is_empty() {
            warn!("Serving stale asset listing ({} entries)", stale.len());
            return Ok(Self::truncated(stale, limit));
        }

        warn!("No cached asset listing available, serving baseline dataset");
        Ok(Self::truncated(baseline_assets(), limit))
    }

    async fn get_current_price(&self, asset_id: &str) -> Result<Decimal, MarketDataError> {
        let now = Utc::now();
        let limited = self.budget.is_exhausted(now);

        if let Some(price) = self.cache.price_if_fresh(asset_id, now, limited) {
            return Ok(price);
        }

        let mut acquired = false;
        if self.budget.try_acquire(now) {
            acquired = true;
            match self.provider.fetch_spot_price(asset_id).await {
                Ok(price) => {
                    self.cache.record_price(asset_id, price, Utc::now());
                    self.persist_cache().await;
                    return Ok(price);
                }
                Err(e) => {
                    if e.is_rate_limit() {
                        self.budget.note_rate_limited(Utc::now());
                    }
                    warn!("Spot price fetch for {} failed: {}", asset_id, e);
                }
            }
        }

        if let Some(price) = self.cache.price(asset_id) {
            warn!("Serving stale cached price for {}", asset_id);
            return Ok(price);
        }

        if let Some(price) = baseline_price(asset_id) {
            warn!("Serving baseline price for {}", asset_id);
            return Ok(price);
        }

        if acquired {
            Err(MarketDataError::AssetNotFound(asset_id.to_string()))
        } else {
            let status = self.budget.status(Utc::now());
            Err(MarketDataError::BudgetExhausted {
                until: status.next_call_at,
            })
        }
    }

    async fn get_asset_details(&self, asset_id: &str) -> Result<MarketAsset, MarketDataError> {
        let now = Utc::now();
        let limited = self.budget.is_exhausted(now);

        if self.cache.is_fresh(now, limited) {
            if let Some(asset) = self.cache.asset(asset_id) {
                return Ok(asset);
            }
        }

        let mut acquired = false;
        if self.budget.try_acquire(now) {
            acquired = true;
            match self.provider.fetch_asset_details(asset_id).await {
                Ok(asset) => {
                    self.cache
                        .record_price(asset_id, asset.current_price, Utc::now());
                    self.persist_cache().await;
                    return Ok(asset);
                }
                Err(e) => {
                    if e.is_rate_limit() {
                        self.budget.note_rate_limited(Utc::now());
                    }
                    warn!("Details fetch for {} failed: {}", asset_id, e);
                }
            }
        }

        if let Some(asset) = self.cache.asset(asset_id) {
            warn!("Serving stale listing entry for {}", asset_id);
            return Ok(asset);
        }

        if let Some(asset) = baseline_assets().into_iter().find(|a| a.id == asset_id) {
            warn!("Serving baseline entry for {}", asset_id);
            return Ok(asset);
        }

        if acquired {
            Err(MarketDataError::AssetNotFound(asset_id.to_string()))
        } else {
            let status = self.budget.status(Utc::now());
            Err(MarketDataError::BudgetExhausted {
                until: status.next_call_at,
            })
        }
    }

    async fn search_assets(&self, query: &str) -> Result<Vec<MarketAsset>, MarketDataError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        // Search is a filter over the listing; it never gets its own
        // network call beyond what the listing ladder spends.
        let assets = self.list_top_assets(LISTING_FETCH_SIZE).await?;
        Ok(assets
            .into_iter()
            .filter(|a| a.matches_query(query))
            .collect())
    }

    async fn get_historical_series(
        &self,
        asset_id: &str,
        days: u32,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        let now = Utc::now();

        if let Some(points) = self.cache.series_if_fresh(asset_id, days, now) {
            return Ok(points);
        }

        if !self.budget.try_acquire(now) {
            let status = self.budget.status(now);
            return Err(MarketDataError::BudgetExhausted {
                until: status.next_call_at,
            });
        }

        match self.provider.fetch_market_chart(asset_id, days).await {
            Ok(points) => {
                self.cache
                    .record_series(asset_id, days, points.clone(), Utc::now());
                Ok(points)
            }
            Err(e) => {
                if e.is_rate_limit() {
                    self.budget.note_rate_limited(Utc::now());
                }
                Err(e)
            }
        }
    }

    fn cached_price(&self, asset_id: &str) -> Option<Decimal> {
        self.cache.price(asset_id)
    }

    fn cached_asset(&self, asset_id: &str) -> Option<MarketAsset> {
        self.cache.asset(asset_id)
    }

    fn is_rate_limited(&self) -> bool {
        self.budget.is_exhausted(Utc::now())
    }

    async fn clear_cache(&self) {
        self.cache.clear();
        self.persist_cache().await;
    }
}
