//! Price cache with staleness-aware TTLs.
//!
//! The asset list and individual prices are cached together and survive
//! restarts through the [`CacheStore`] seam. A cache entry older than the
//! normal TTL is still served while the call budget is exhausted (the TTL
//! stretches), and even an arbitrarily stale entry beats the static fallback
//! dataset.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{MarketAsset, PricePoint};

/// Normal asset-list validity, in hours.
const DEFAULT_LIST_TTL_HOURS: i64 = 6;

/// Stretched validity while the call budget is exhausted, in hours.
const DEFAULT_EXTENDED_TTL_HOURS: i64 = 12;

/// A single cached price with its observation time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPrice {
    pub price: Decimal,
    pub as_of: DateTime<Utc>,
}

/// Serializable state of the cache, persisted as one blob.
///
/// Schema changes are handled by bumping the storage key version, so this
/// struct carries no inner version field.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceCacheSnapshot {
    #[serde(default)]
    pub assets: Vec<MarketAsset>,
    #[serde(default)]
    pub prices: HashMap<String, CachedPrice>,
    #[serde(default)]
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Persistence seam for the price cache.
///
/// Implementations are best-effort: `load` answers `None` when nothing
/// usable is stored (including on read errors, which the implementation
/// logs), and `save` failures must be absorbed and logged, never surfaced.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn load(&self) -> Option<PriceCacheSnapshot>;
    async fn save(&self, snapshot: PriceCacheSnapshot);
}

/// In-memory store for tests and cache-less setups.
#[derive(Default)]
pub struct MemoryCacheStore {
    inner: Mutex<Option<PriceCacheSnapshot>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn load(&self) -> Option<PriceCacheSnapshot> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    async fn save(&self, snapshot: PriceCacheSnapshot) {
        *self.inner.lock().unwrap_or_else(|p| p.into_inner()) = Some(snapshot);
    }
}

/// TTL configuration for the cache.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub list_ttl: Duration,
    /// Validity while rate limited; must be >= `list_ttl`.
    pub extended_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            list_ttl: Duration::hours(DEFAULT_LIST_TTL_HOURS),
            extended_ttl: Duration::hours(DEFAULT_EXTENDED_TTL_HOURS),
        }
    }
}

/// Thread-safe in-memory price cache.
///
/// Historical series are memoized separately and never persisted; they are
/// cheap to refetch once the budget allows it.
pub struct PriceCache {
    config: CacheConfig,
    state: Mutex<PriceCacheSnapshot>,
    series: Mutex<HashMap<(String, u32), (Vec<PricePoint>, DateTime<Utc>)>>,
}

impl PriceCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(PriceCacheSnapshot::default()),
            series: Mutex::new(HashMap::new()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, PriceCacheSnapshot> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Price cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_series(
        &self,
    ) -> MutexGuard<'_, HashMap<(String, u32), (Vec<PricePoint>, DateTime<Utc>)>> {
        self.series.lock().unwrap_or_else(|poisoned| {
            warn!("Series cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Replace the asset list and refresh the per-asset prices from it.
    pub fn replace_assets(&self, assets: Vec<MarketAsset>, now: DateTime<Utc>) {
        let mut state = self.lock_state();
        for asset in &assets {
            state.prices.insert(
                asset.id.clone(),
                CachedPrice {
                    price: asset.current_price,
                    as_of: now,
                },
            );
        }
        state.assets = assets;
        state.fetched_at = Some(now);
    }

    /// Record one price observation (from a spot price fetch).
    pub fn record_price(&self, asset_id: &str, price: Decimal, now: DateTime<Utc>) {
        let mut state = self.lock_state();
        state.prices.insert(
            asset_id.to_string(),
            CachedPrice {
                price,
                as_of: now,
            },
        );
        // Keep the listed asset in sync so list consumers see the new price
        if let Some(asset) = state.assets.iter_mut().find(|a| a.id == asset_id) {
            asset.current_price = price;
            asset.last_updated = Some(now);
        }
    }

    fn effective_ttl(&self, extended: bool) -> Duration {
        if extended {
            self.config.extended_ttl
        } else {
            self.config.list_ttl
        }
    }

    /// True when the cached asset list is within its TTL.
    pub fn is_fresh(&self, now: DateTime<Utc>, extended: bool) -> bool {
        let state = self.lock_state();
        match state.fetched_at {
            Some(at) if !state.assets.is_empty() => now - at < self.effective_ttl(extended),
            _ => false,
        }
    }

    /// The asset list, only if within TTL.
    pub fn assets_if_fresh(&self, now: DateTime<Utc>, extended: bool) -> Option<Vec<MarketAsset>> {
        let state = self.lock_state();
        match state.fetched_at {
            Some(at) if !state.assets.is_empty() && now - at < self.effective_ttl(extended) => {
                Some(state.assets.clone())
            }
            _ => None,
        }
    }

    /// The asset list regardless of age. Empty when never populated.
    pub fn assets_any_age(&self) -> Vec<MarketAsset> {
        self.lock_state().assets.clone()
    }

    /// Cached price for one asset, regardless of age.
    pub fn price(&self, asset_id: &str) -> Option<Decimal> {
        self.lock_state().prices.get(asset_id).map(|c| c.price)
    }

    /// Cached price for one asset, only if its own observation is within TTL.
    pub fn price_if_fresh(
        &self,
        asset_id: &str,
        now: DateTime<Utc>,
        extended: bool,
    ) -> Option<Decimal> {
        self.lock_state()
            .prices
            .get(asset_id)
            .filter(|c| now - c.as_of < self.effective_ttl(extended))
            .map(|c| c.price)
    }

    /// Cached listing entry for one asset, regardless of age.
    pub fn asset(&self, asset_id: &str) -> Option<MarketAsset> {
        self.lock_state()
            .assets
            .iter()
            .find(|a| a.id == asset_id)
            .cloned()
    }

    /// Memoized historical series, only if within the list TTL.
    pub fn series_if_fresh(
        &self,
        asset_id: &str,
        days: u32,
        now: DateTime<Utc>,
    ) -> Option<Vec<PricePoint>> {
        let series = self.lock_series();
        series
            .get(&(asset_id.to_string(), days))
            .filter(|(_, at)| now - *at < self.config.list_ttl)
            .map(|(points, _)| points.clone())
    }

    pub fn record_series(
        &self,
        asset_id: &str,
        days: u32,
        points: Vec<PricePoint>,
        now: DateTime<Utc>,
    ) {
        self.lock_series()
            .insert((asset_id.to_string(), days), (points, now));
    }

    /// Copy of the persistable state.
    pub fn snapshot(&self) -> PriceCacheSnapshot {
        self.lock_state().clone()
    }

    /// Restore persisted state, replacing whatever is in memory.
    pub fn restore(&self, snapshot: PriceCacheSnapshot) {
        *self.lock_state() = snapshot;
    }

    /// Drop everything, including series memos.
    pub fn clear(&self) {
        *self.lock_state() = PriceCacheSnapshot::default();
        self.lock_series().clear();
    }
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
