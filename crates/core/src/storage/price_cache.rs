//! Bridges the market data cache into the engine's key-value store.

use std::sync::Arc;

use async_trait::async_trait;
use log::warn;

use coinfolio_market_data::{CacheStore, PriceCacheSnapshot};

use crate::constants::PRICE_CACHE_KEY;
use crate::storage::KeyValueStore;

/// Persists the market price cache as one JSON blob in the key-value store.
///
/// The cache key is global, not per user: prices are the same for every
/// portfolio sharing the store. Load and save are best-effort per the
/// [`CacheStore`] contract; failures are logged and absorbed.
pub struct KvCacheStore {
    store: Arc<dyn KeyValueStore>,
}

impl KvCacheStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CacheStore for KvCacheStore {
    async fn load(&self) -> Option<PriceCacheSnapshot> {
        match self.store.get(PRICE_CACHE_KEY).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!("Discarding unreadable price cache: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to load persisted price cache: {}", e);
                None
            }
        }
    }

    async fn save(&self, snapshot: PriceCacheSnapshot) {
        let json = match serde_json::to_string(&snapshot) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize price cache: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(PRICE_CACHE_KEY, &json).await {
            warn!("Failed to persist price cache: {}", e);
        }
    }
}
