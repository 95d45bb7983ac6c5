//! Portfolio valuation engine.
//!
//! Rebuilds holdings from the ledger, resolves a current price for each
//! through a fallback chain that degrades from live data to averages, and
//! publishes the aggregate summary. One pass runs at a time. Paths that
//! cannot produce trustworthy numbers fall back to the last good state
//! instead of zeroing the portfolio.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use tokio::sync::{broadcast, Mutex as AsyncMutex};

use coinfolio_market_data::MarketDataServiceTrait;

use crate::errors::Result;
use crate::ledger::LedgerServiceTrait;
use crate::portfolio::holdings::{aggregate_positions, AssetPosition, Holding};
use crate::portfolio::snapshot::integrity::percentage_change;
use crate::portfolio::snapshot::{SnapshotInput, SnapshotServiceTrait, SnapshotSource};

use super::refresh_policy::RefreshPolicy;
use super::valuation_model::{CachedValue, PortfolioSummary, PortfolioUpdate};
use super::valuation_traits::ValuationServiceTrait;

/// Capacity of the update broadcast channel. Slow subscribers miss
/// intermediate updates rather than blocking the engine.
const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// How a valuation pass may source prices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RefreshMode {
    /// Cached and derived prices only. Never spends network budget.
    CacheOnly,
    /// May fetch live prices, subject to the provider's call budget.
    Network,
}

/// Why a valuation pass is running. Passes that follow a ledger mutation
/// trust an all-zero result; refresh and startup passes treat one as a
/// spurious wipe when the previous summary was nonzero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PassTrigger {
    Refresh,
    LedgerChange,
}

/// Live portfolio valuation over the ledger, the snapshot store and the
/// market data service.
pub struct ValuationService {
    ledger: Arc<dyn LedgerServiceTrait>,
    snapshots: Arc<dyn SnapshotServiceTrait>,
    market_data: Arc<dyn MarketDataServiceTrait>,
    /// Serializes valuation passes; triggers queue rather than interleave.
    calc_lock: AsyncMutex<()>,
    summary_cache: Mutex<CachedValue<PortfolioSummary>>,
    holdings_cache: Mutex<CachedValue<Vec<Holding>>>,
    /// Prices resolved by previous passes, by asset id.
    prices: DashMap<String, Decimal>,
    policy: Mutex<RefreshPolicy>,
    updates: broadcast::Sender<PortfolioUpdate>,
}

impl ValuationService {
    pub fn new(
        ledger: Arc<dyn LedgerServiceTrait>,
        snapshots: Arc<dyn SnapshotServiceTrait>,
        market_data: Arc<dyn MarketDataServiceTrait>,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            ledger,
            snapshots,
            market_data,
            calc_lock: AsyncMutex::new(()),
            summary_cache: Mutex::new(CachedValue::default()),
            holdings_cache: Mutex::new(CachedValue::default()),
            prices: DashMap::new(),
            policy: Mutex::new(RefreshPolicy::new()),
            updates,
        }
    }

    fn lock_summary(&self) -> MutexGuard<'_, CachedValue<PortfolioSummary>> {
        self.summary_cache.lock().unwrap_or_else(|poisoned| {
            warn!("Summary cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_holdings(&self) -> MutexGuard<'_, CachedValue<Vec<Holding>>> {
        self.holdings_cache.lock().unwrap_or_else(|poisoned| {
            warn!("Holdings cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_policy(&self) -> MutexGuard<'_, RefreshPolicy> {
        self.policy.lock().unwrap_or_else(|poisoned| {
            warn!("Refresh policy mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Fan out an update; lagging subscribers are dropped, not waited on.
    fn publish(&self, holdings: Vec<Holding>, summary: PortfolioSummary) {
        let _ = self.updates.send(PortfolioUpdate { holdings, summary });
    }

    /// Best price available without touching the network: the market data
    /// cache, then prices memoized by earlier passes, then the position's
    /// own average price.
    fn cached_chain(&self, position: &AssetPosition) -> Decimal {
        let asset_id = position.asset_id.as_str();

        if let Some(price) = self.market_data.cached_price(asset_id) {
            if price > Decimal::ZERO {
                return price;
            }
        }
        if let Some(price) = self.prices.get(asset_id) {
            if *price > Decimal::ZERO {
                return *price;
            }
        }
        Self::derived_price(position)
    }

    /// Resolve the current price for one position.
    ///
    /// Network passes go through the market data service, which is itself
    /// cache-first, so fresh cached prices never cost a budgeted call while
    /// stale ones get refetched. When the spot endpoint fails, the listing
    /// details endpoint is the secondary live source. Everything else
    /// degrades through [`Self::cached_chain`].
    async fn resolve_price(&self, position: &AssetPosition, mode: RefreshMode) -> Decimal {
        // A known-exhausted budget means a live attempt can only fail, so
        // degrade to cached data without spending anything.
        if mode == RefreshMode::CacheOnly || self.market_data.is_rate_limited() {
            return self.cached_chain(position);
        }

        let asset_id = position.asset_id.as_str();
        match self.market_data.get_current_price(asset_id).await {
            Ok(price) if price > Decimal::ZERO => {
                self.prices.insert(asset_id.to_string(), price);
                return price;
            }
            Ok(price) => {
                warn!(
                    "Provider returned non-positive price {} for {}",
                    price, asset_id
                );
            }
            Err(e) => {
                debug!("Spot price for {} unavailable: {}", asset_id, e);
                if let Ok(asset) = self.market_data.get_asset_details(asset_id).await {
                    if asset.current_price > Decimal::ZERO {
                        self.prices
                            .insert(asset_id.to_string(), asset.current_price);
                        return asset.current_price;
                    }
                }
            }
        }

        self.cached_chain(position)
    }

    /// The position's average price when it has one, otherwise one. The
    /// constant keeps the downstream value math total; nothing ever
    /// renders NaN.
    fn derived_price(position: &AssetPosition) -> Decimal {
        let average = position.average_price();
        if average > Decimal::ZERO {
            average
        } else {
            Decimal::ONE
        }
    }

    /// True when a non-mutating pass computed an all-zero portfolio over
    /// nonzero prior state. A refresh never changes the ledger, so that
    /// pattern means the input data went missing mid-pass, not that the
    /// portfolio actually emptied.
    fn is_spurious_reset(&self, summary: &PortfolioSummary) -> bool {
        if !summary.total_value.is_zero() || !summary.profit_loss.is_zero() {
            return false;
        }
        match self.lock_summary().get() {
            Some(previous) => {
                !previous.profit_loss.is_zero() && previous.total_value > Decimal::ZERO
            }
            None => false,
        }
    }

    /// Serve the last trustworthy state instead of a zeroed result:
    /// preferably the persisted snapshot, else the previous in-memory
    /// summary. Holdings keep their previous cached value.
    async fn restore_last_known_good(&self) -> Option<PortfolioSummary> {
        warn!("Refresh computed an all-zero portfolio over nonzero prior state, restoring last known good");

        let restored = match self.snapshots.load_snapshot(true).await {
            Some(snapshot) => {
                info!(
                    "Restored summary from snapshot saved at {}",
                    snapshot.saved_at
                );
                PortfolioSummary::from(&snapshot)
            }
            None => self.lock_summary().get()?,
        };

        let now = Utc::now();
        self.lock_summary().set(restored.clone(), now);
        let holdings = self.lock_holdings().get().unwrap_or_default();
        self.publish(holdings, restored.clone());
        Some(restored)
    }

    /// One full valuation pass. Callers hold `calc_lock`.
    async fn run_calculation(
        &self,
        mode: RefreshMode,
        trigger: PassTrigger,
        source: SnapshotSource,
    ) -> Option<PortfolioSummary> {
        let transactions = match self.ledger.list_transactions().await {
            Ok(transactions) => transactions,
            Err(e) => {
                error!("Valuation pass aborted, ledger read failed: {}", e);
                return None;
            }
        };

        let positions = aggregate_positions(&transactions);
        let mut holdings = Vec::with_capacity(positions.len());
        for position in positions {
            let icon_url = self
                .market_data
                .cached_asset(&position.asset_id)
                .and_then(|asset| asset.icon_url);
            let price = self.resolve_price(&position, mode).await;
            holdings.push(position.into_holding(price, icon_url));
        }
        holdings.sort_by(|a, b| b.current_value.cmp(&a.current_value));

        let now = Utc::now();
        let mut summary = PortfolioSummary::from_holdings(&holdings, now);

        let report = self
            .snapshots
            .validate_consistency(
                summary.total_value,
                summary.total_invested,
                summary.profit_loss,
            )
            .await;
        if !report.is_valid {
            warn!(
                "Computed P&L {} disagreed with the definitional formula, using {}",
                summary.profit_loss, report.expected_profit_loss
            );
            summary.profit_loss = report.expected_profit_loss;
            summary.percentage_change =
                percentage_change(summary.profit_loss, summary.total_invested);
        }

        if trigger == PassTrigger::Refresh && self.is_spurious_reset(&summary) {
            return self.restore_last_known_good().await;
        }

        // Nothing recorded and nothing cached yet: persisting an all-empty
        // snapshot would only erase the first-use signal.
        let skip_persist = transactions.is_empty() && self.lock_summary().get().is_none();
        if !skip_persist {
            let saved = self
                .snapshots
                .save_snapshot(SnapshotInput {
                    total_value: summary.total_value,
                    total_invested: summary.total_invested,
                    profit_loss: summary.profit_loss,
                    percentage_change: summary.percentage_change,
                    transaction_count: transactions.len(),
                    holdings_count: holdings.len(),
                    calculated_at: now,
                    source,
                    details: None,
                })
                .await;
            if !saved {
                warn!("Valuation pass completed but the snapshot save did not land");
            }
        }

        self.lock_summary().set(summary.clone(), now);
        self.lock_holdings().set(holdings.clone(), now);
        self.publish(holdings, summary.clone());

        debug!(
            "Valuation pass done: {} holdings, total value {}",
            summary.holdings_count, summary.total_value
        );
        Some(summary)
    }
}

#[async_trait]
impl ValuationServiceTrait for ValuationService {
    async fn initialize(&self) {
        let _guard = self.calc_lock.lock().await;

        if let Some(snapshot) = self.snapshots.load_snapshot(true).await {
            info!(
                "Restored portfolio summary from snapshot saved at {}",
                snapshot.saved_at
            );
            self.lock_summary()
                .set(PortfolioSummary::from(&snapshot), Utc::now());
        }

        // Holdings come from a cache-only pass so startup never waits on
        // the network; live prices arrive with the first refresh.
        let _ = self
            .run_calculation(
                RefreshMode::CacheOnly,
                PassTrigger::Refresh,
                SnapshotSource::CacheOnlyCalculation,
            )
            .await;
    }

    async fn refresh(&self) -> Option<PortfolioSummary> {
        let _guard = self.calc_lock.lock().await;

        if !self.lock_policy().can_refresh(Utc::now()) {
            debug!("Refresh inside cooldown, revaluing from caches only");
            return self
                .run_calculation(
                    RefreshMode::CacheOnly,
                    PassTrigger::Refresh,
                    SnapshotSource::CacheOnlyCalculation,
                )
                .await;
        }

        let summary = self
            .run_calculation(
                RefreshMode::Network,
                PassTrigger::Refresh,
                SnapshotSource::ScheduledRefresh,
            )
            .await;
        if summary.is_some() {
            self.lock_policy().note_completed(Utc::now());
        }
        summary
    }

    async fn force_manual_refresh(&self) -> Option<PortfolioSummary> {
        let _guard = self.calc_lock.lock().await;

        let broke_cooldown = self.lock_policy().begin_manual(Utc::now());
        if broke_cooldown {
            info!("Manual refresh overriding a live cooldown, penalty applies");
        }

        let summary = self
            .run_calculation(
                RefreshMode::Network,
                PassTrigger::Refresh,
                SnapshotSource::ManualRefresh,
            )
            .await;
        if summary.is_some() {
            self.lock_policy().complete_manual(Utc::now(), broke_cooldown);
        }
        summary
    }

    async fn get_cached_summary(&self) -> Option<PortfolioSummary> {
        self.lock_summary().get()
    }

    async fn get_holdings_with_current_prices(&self) -> Vec<Holding> {
        if let Some(holdings) = self.lock_holdings().get() {
            return holdings;
        }

        let _guard = self.calc_lock.lock().await;
        // A queued pass may have filled the cache while we waited.
        if let Some(holdings) = self.lock_holdings().get() {
            return holdings;
        }

        let _ = self
            .run_calculation(
                RefreshMode::CacheOnly,
                PassTrigger::Refresh,
                SnapshotSource::CacheOnlyCalculation,
            )
            .await;
        self.lock_holdings().get().unwrap_or_default()
    }

    async fn get_holding(&self, asset_id: &str) -> Option<Holding> {
        self.get_holdings_with_current_prices()
            .await
            .into_iter()
            .find(|h| h.asset_id == asset_id)
    }

    async fn delete_asset(&self, asset_id: &str) -> Result<usize> {
        let removed = self.ledger.remove_by_asset(asset_id).await?;
        if removed > 0 {
            self.prices.remove(asset_id);
            let _guard = self.calc_lock.lock().await;
            let _ = self
                .run_calculation(
                    RefreshMode::CacheOnly,
                    PassTrigger::LedgerChange,
                    SnapshotSource::Calculated,
                )
                .await;
        }
        Ok(removed)
    }

    async fn clear_cache(&self) {
        self.lock_summary().invalidate();
        self.lock_holdings().invalidate();
        self.prices.clear();
        self.market_data.clear_cache().await;
        info!("Valuation caches cleared");
    }

    fn subscribe(&self) -> broadcast::Receiver<PortfolioUpdate> {
        self.updates.subscribe()
    }

    async fn on_transactions_changed(&self) {
        let _guard = self.calc_lock.lock().await;
        let _ = self
            .run_calculation(
                RefreshMode::CacheOnly,
                PassTrigger::LedgerChange,
                SnapshotSource::Calculated,
            )
            .await;
    }
}
