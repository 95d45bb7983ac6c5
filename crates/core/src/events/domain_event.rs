//! Domain event types.

use serde::{Deserialize, Serialize};

/// Domain events emitted by core services after successful mutations.
///
/// These events represent facts about domain data changes. The valuation
/// engine consumes them to keep the portfolio summary current without the
/// ledger depending on the engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Transactions were created, updated, or deleted.
    TransactionsChanged {
        /// Asset ids touched by the mutation.
        asset_ids: Vec<String>,
    },
}

impl DomainEvent {
    /// Creates a TransactionsChanged event.
    pub fn transactions_changed(asset_ids: Vec<String>) -> Self {
        Self::TransactionsChanged { asset_ids }
    }
}
