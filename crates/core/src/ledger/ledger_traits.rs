//! Service trait for the transaction ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::ledger::{LedgerStatistics, NewTransaction, Transaction, TransactionUpdate};

/// Service trait for managing the transaction ledger.
///
/// The ledger is the sole writer of transaction records. Every successful
/// mutation emits a domain event so dependents (valuation) can react.
#[async_trait]
pub trait LedgerServiceTrait: Send + Sync {
    /// Validate and persist a new transaction. Returns the stored record.
    async fn add_transaction(&self, draft: NewTransaction) -> Result<Transaction>;

    /// Replace an existing transaction wholesale.
    /// Fails with `TransactionNotFound` when the id is unknown.
    async fn update_transaction(&self, update: TransactionUpdate) -> Result<Transaction>;

    /// Remove one transaction. Returns whether a record existed.
    async fn remove_transaction(&self, id: &str) -> Result<bool>;

    /// Remove every transaction for one asset. Returns how many went away.
    async fn remove_by_asset(&self, asset_id: &str) -> Result<usize>;

    /// All transactions, newest first.
    async fn list_transactions(&self) -> Result<Vec<Transaction>>;

    /// Transactions for one asset, newest first.
    async fn list_by_asset(&self, asset_id: &str) -> Result<Vec<Transaction>>;

    /// Transactions whose timestamp falls inside `[start - 1 day, end + 1 day)`.
    ///
    /// The one-day pad on both ends absorbs timezone skew between the
    /// caller's calendar dates and the stored UTC instants.
    async fn list_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transaction>>;

    /// Aggregate counters over the whole ledger.
    async fn statistics(&self) -> Result<LedgerStatistics>;
}
