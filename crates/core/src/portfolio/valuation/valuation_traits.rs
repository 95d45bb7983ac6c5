use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::errors::Result;
use crate::portfolio::holdings::Holding;

use super::valuation_model::{PortfolioSummary, PortfolioUpdate};

/// Live portfolio valuation engine.
///
/// The engine never surfaces pricing failures to callers. A pass that cannot
/// reach the network falls back through cached and derived prices, and read
/// accessors serve the in-memory caches.
#[async_trait]
pub trait ValuationServiceTrait: Send + Sync {
    /// Cold-start the engine: restore the last saved snapshot when one
    /// exists, otherwise value the ledger from cached prices only.
    async fn initialize(&self);

    /// Scheduled refresh. Uses the network when the cooldown allows it,
    /// otherwise revalues from cached prices. Returns the resulting summary.
    async fn refresh(&self) -> Option<PortfolioSummary>;

    /// User-triggered refresh. Always allowed to use the network; breaking
    /// into a live cooldown extends the next one.
    async fn force_manual_refresh(&self) -> Option<PortfolioSummary>;

    /// Latest computed summary, if any pass has completed.
    async fn get_cached_summary(&self) -> Option<PortfolioSummary>;

    /// Current holdings with the most recent prices the engine has seen.
    /// Never touches the network.
    async fn get_holdings_with_current_prices(&self) -> Vec<Holding>;

    /// Single holding by asset id, from the same cache as the list call.
    async fn get_holding(&self, asset_id: &str) -> Option<Holding>;

    /// Remove every transaction for an asset and revalue. Returns the
    /// number of removed transactions.
    async fn delete_asset(&self, asset_id: &str) -> Result<usize>;

    /// Drop all in-memory valuation state and cached prices.
    async fn clear_cache(&self);

    /// Subscribe to portfolio updates published after each completed pass.
    fn subscribe(&self) -> broadcast::Receiver<PortfolioUpdate>;

    /// Ledger change hook: revalue from cached prices without spending
    /// any network budget.
    async fn on_transactions_changed(&self);
}
