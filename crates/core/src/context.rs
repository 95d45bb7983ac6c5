//! Service wiring.
//!
//! Builds the full service graph over one key-value store and one market
//! data provider, restores persisted portfolio state, and pumps ledger
//! change events into revaluation passes.

use std::sync::Arc;

use log::{debug, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use coinfolio_market_data::MarketDataServiceTrait;

use crate::events::{ChannelEventSink, DomainEvent};
use crate::ledger::{LedgerService, LedgerServiceTrait};
use crate::portfolio::snapshot::{SnapshotService, SnapshotServiceTrait};
use crate::portfolio::valuation::{ValuationService, ValuationServiceTrait};
use crate::storage::{KeyValueStore, UserKeys};

/// Shared handles to the engine services, wired once at startup.
pub struct ServiceContext {
    pub ledger_service: Arc<dyn LedgerServiceTrait>,
    pub snapshot_service: Arc<dyn SnapshotServiceTrait>,
    pub valuation_service: Arc<dyn ValuationServiceTrait>,
    pub market_data_service: Arc<dyn MarketDataServiceTrait>,
    event_pump: JoinHandle<()>,
}

impl ServiceContext {
    /// Builds the services over `store` for one user namespace, replays
    /// persisted state, and starts the ledger event pump.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn initialize(
        store: Arc<dyn KeyValueStore>,
        market_data: Arc<dyn MarketDataServiceTrait>,
        namespace: impl Into<String>,
    ) -> Self {
        let namespace = namespace.into();
        let keys = UserKeys::new(namespace.clone());

        let (event_sink, events) = ChannelEventSink::new();

        let ledger_service: Arc<dyn LedgerServiceTrait> = Arc::new(LedgerService::new(
            store.clone(),
            Arc::new(event_sink),
            keys.clone(),
        ));
        let snapshot_service: Arc<dyn SnapshotServiceTrait> =
            Arc::new(SnapshotService::new(store, keys));
        let valuation_service: Arc<dyn ValuationServiceTrait> = Arc::new(ValuationService::new(
            ledger_service.clone(),
            snapshot_service.clone(),
            market_data.clone(),
        ));

        valuation_service.initialize().await;

        let event_pump = spawn_event_pump(events, valuation_service.clone());

        info!("Service context initialized for namespace '{}'", namespace);

        Self {
            ledger_service,
            snapshot_service,
            valuation_service,
            market_data_service: market_data,
            event_pump,
        }
    }

    pub fn ledger_service(&self) -> Arc<dyn LedgerServiceTrait> {
        Arc::clone(&self.ledger_service)
    }

    pub fn snapshot_service(&self) -> Arc<dyn SnapshotServiceTrait> {
        Arc::clone(&self.snapshot_service)
    }

    pub fn valuation_service(&self) -> Arc<dyn ValuationServiceTrait> {
        Arc::clone(&self.valuation_service)
    }

    pub fn market_data_service(&self) -> Arc<dyn MarketDataServiceTrait> {
        Arc::clone(&self.market_data_service)
    }
}

impl Drop for ServiceContext {
    fn drop(&mut self) {
        self.event_pump.abort();
    }
}

/// Forwards ledger change events into valuation passes.
///
/// The pump owns the receiving half of the ledger's event channel and runs
/// until the context is dropped or every sender is gone.
fn spawn_event_pump(
    mut events: mpsc::UnboundedReceiver<DomainEvent>,
    valuation_service: Arc<dyn ValuationServiceTrait>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                DomainEvent::TransactionsChanged { asset_ids } => {
                    debug!(
                        "Ledger changed ({} asset(s)), recalculating portfolio",
                        asset_ids.len()
                    );
                    valuation_service.on_transactions_changed().await;
                }
            }
        }
        debug!("Domain event pump stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use coinfolio_market_data::{MarketAsset, MarketDataError, PricePoint};

    use crate::ledger::{NewTransaction, TransactionKind};
    use crate::storage::MemoryKeyValueStore;

    struct StubMarketData {
        prices: HashMap<String, Decimal>,
    }

    impl StubMarketData {
        fn with_price(asset_id: &str, price: Decimal) -> Self {
            let mut prices = HashMap::new();
            prices.insert(asset_id.to_string(), price);
            Self { prices }
        }
    }

    #[async_trait]
    impl MarketDataServiceTrait for StubMarketData {
        async fn list_top_assets(
            &self,
            _limit: usize,
        ) -> std::result::Result<Vec<MarketAsset>, MarketDataError> {
            Ok(Vec::new())
        }

        async fn get_current_price(
            &self,
            asset_id: &str,
        ) -> std::result::Result<Decimal, MarketDataError> {
            self.prices
                .get(asset_id)
                .copied()
                .ok_or_else(|| MarketDataError::AssetNotFound(asset_id.to_string()))
        }

        async fn get_asset_details(
            &self,
            asset_id: &str,
        ) -> std::result::Result<MarketAsset, MarketDataError> {
            Err(MarketDataError::AssetNotFound(asset_id.to_string()))
        }

        async fn search_assets(
            &self,
            _query: &str,
        ) -> std::result::Result<Vec<MarketAsset>, MarketDataError> {
            Ok(Vec::new())
        }

        async fn get_historical_series(
            &self,
            asset_id: &str,
            _days: u32,
        ) -> std::result::Result<Vec<PricePoint>, MarketDataError> {
            Err(MarketDataError::AssetNotFound(asset_id.to_string()))
        }

        fn cached_price(&self, asset_id: &str) -> Option<Decimal> {
            self.prices.get(asset_id).copied()
        }

        fn cached_asset(&self, _asset_id: &str) -> Option<MarketAsset> {
            None
        }

        fn is_rate_limited(&self) -> bool {
            false
        }

        async fn clear_cache(&self) {}
    }

    fn new_buy(asset_id: &str, amount: Decimal, price: Decimal) -> NewTransaction {
        NewTransaction {
            asset_id: asset_id.to_string(),
            symbol: asset_id.to_uppercase(),
            name: asset_id.to_string(),
            kind: TransactionKind::Buy,
            amount,
            price_per_unit: price,
            timestamp: Some(Utc::now()),
            exchange: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_context_wires_ledger_events_to_valuation() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let market_data = Arc::new(StubMarketData::with_price("bitcoin", dec!(50000)));
        let context = ServiceContext::initialize(store, market_data, "ctx_test").await;

        let mut updates = context.valuation_service().subscribe();

        context
            .ledger_service()
            .add_transaction(new_buy("bitcoin", dec!(0.5), dec!(40000)))
            .await
            .unwrap();

        // The pump runs on its own task; the broadcast proves it fired.
        let update = tokio::time::timeout(std::time::Duration::from_secs(5), updates.recv())
            .await
            .expect("valuation update should arrive")
            .expect("channel should stay open");

        assert_eq!(update.holdings.len(), 1);
        assert_eq!(update.summary.total_invested, dec!(20000));
        assert_eq!(update.summary.total_value, dec!(25000));
    }

    #[tokio::test]
    async fn test_context_initialize_replays_persisted_ledger() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let market_data = Arc::new(StubMarketData::with_price("ethereum", dec!(3000)));

        {
            let context =
                ServiceContext::initialize(store.clone(), market_data.clone(), "replay_test")
                    .await;
            context
                .ledger_service()
                .add_transaction(new_buy("ethereum", dec!(2), dec!(2500)))
                .await
                .unwrap();
            // Let the pump finish its pass before tearing the context down.
            let summary = context.valuation_service().refresh().await;
            assert!(summary.is_some());
        }

        let context = ServiceContext::initialize(store, market_data, "replay_test").await;
        let summary = context
            .valuation_service()
            .get_cached_summary()
            .await
            .expect("restart should restore the portfolio");
        assert_eq!(summary.total_invested, dec!(5000));
        assert_eq!(summary.total_value, dec!(6000));
    }

    #[tokio::test]
    async fn test_accessors_share_one_service_instance() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let market_data = Arc::new(StubMarketData::with_price("bitcoin", dec!(50000)));
        let context = ServiceContext::initialize(store, market_data, "accessor_test").await;

        let a = context.valuation_service();
        let b = context.valuation_service();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
