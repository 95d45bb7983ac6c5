//! Transaction ledger service over the key-value store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

use crate::errors::{Error, Result, StorageError};
use crate::events::{DomainEvent, DomainEventSink};
use crate::ledger::{
    LedgerStatistics, LedgerServiceTrait, NewTransaction, Transaction, TransactionUpdate,
};
use crate::storage::{KeyValueStore, UserKeys};

/// Service for managing the transaction ledger.
///
/// The whole ledger lives as one JSON array under a per-user key; records
/// are small and bounded by human data entry, so reading and rewriting the
/// array per mutation is simpler than an incremental structure.
pub struct LedgerService {
    store: Arc<dyn KeyValueStore>,
    event_sink: Arc<dyn DomainEventSink>,
    keys: UserKeys,
}

impl LedgerService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        event_sink: Arc<dyn DomainEventSink>,
        keys: UserKeys,
    ) -> Self {
        Self {
            store,
            event_sink,
            keys,
        }
    }

    /// Load the full ledger. An absent key is an empty ledger; a value that
    /// fails to parse is surfaced as corruption rather than silently
    /// replaced, so mutations cannot wipe history.
    async fn load_all(&self) -> Result<Vec<Transaction>> {
        let key = self.keys.transactions();
        match self.store.get(&key).await? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                warn!("Transaction ledger under '{}' failed to parse: {}", key, e);
                Error::Storage(StorageError::Corrupted {
                    key,
                    message: e.to_string(),
                })
            }),
        }
    }

    async fn persist_all(&self, transactions: &[Transaction]) -> Result<()> {
        let serialized = serde_json::to_string(transactions)?;
        self.store
            .set(&self.keys.transactions(), &serialized)
            .await
    }

    /// Next transaction id from the persisted counter. If the counter
    /// cannot be advanced the id falls back to a timestamp-derived form so
    /// the mutation itself still succeeds.
    async fn next_id(&self) -> String {
        let key = self.keys.transaction_counter();
        let current = match self.store.get(&key).await {
            Ok(value) => value.and_then(|v| v.parse::<u64>().ok()).unwrap_or(0),
            Err(e) => {
                warn!("Transaction counter read failed: {}", e);
                return format!("tx_{}", Utc::now().timestamp_millis());
            }
        };

        let next = current + 1;
        if let Err(e) = self.store.set(&key, &next.to_string()).await {
            warn!("Transaction counter write failed: {}", e);
            return format!("tx_{}", Utc::now().timestamp_millis());
        }
        format!("tx_{}", next)
    }

    fn sorted_desc(mut transactions: Vec<Transaction>) -> Vec<Transaction> {
        transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        transactions
    }

    fn notify(&self, asset_ids: Vec<String>) {
        self.event_sink
            .emit(DomainEvent::transactions_changed(asset_ids));
    }
}

#[async_trait]
impl LedgerServiceTrait for LedgerService {
    async fn add_transaction(&self, draft: NewTransaction) -> Result<Transaction> {
        draft.validate()?;

        let mut transactions = self.load_all().await?;
        let id = self.next_id().await;
        let transaction = draft.into_transaction(id, Utc::now());
        transactions.push(transaction.clone());
        self.persist_all(&transactions).await?;

        debug!(
            "Added transaction {} ({:?} {} {})",
            transaction.id, transaction.kind, transaction.amount, transaction.asset_id
        );
        self.notify(vec![transaction.asset_id.clone()]);
        Ok(transaction)
    }

    async fn update_transaction(&self, update: TransactionUpdate) -> Result<Transaction> {
        update.validate()?;

        let mut transactions = self.load_all().await?;
        let position = transactions
            .iter()
            .position(|t| t.id == update.id)
            .ok_or_else(|| Error::TransactionNotFound(update.id.clone()))?;

        let previous_asset = transactions[position].asset_id.clone();
        let replacement = update.into_transaction();
        transactions[position] = replacement.clone();
        self.persist_all(&transactions).await?;

        debug!("Updated transaction {}", replacement.id);
        let mut touched = vec![replacement.asset_id.clone()];
        if previous_asset != replacement.asset_id {
            touched.push(previous_asset);
        }
        self.notify(touched);
        Ok(replacement)
    }

    async fn remove_transaction(&self, id: &str) -> Result<bool> {
        let mut transactions = self.load_all().await?;
        let before = transactions.len();
        let mut removed_asset = None;
        transactions.retain(|t| {
            if t.id == id {
                removed_asset = Some(t.asset_id.clone());
                false
            } else {
                true
            }
        });

        if transactions.len() == before {
            return Ok(false);
        }

        self.persist_all(&transactions).await?;
        debug!("Removed transaction {}", id);
        if let Some(asset_id) = removed_asset {
            self.notify(vec![asset_id]);
        }
        Ok(true)
    }

    async fn remove_by_asset(&self, asset_id: &str) -> Result<usize> {
        let mut transactions = self.load_all().await?;
        let before = transactions.len();
        transactions.retain(|t| t.asset_id != asset_id);
        let removed = before - transactions.len();

        if removed == 0 {
            return Ok(0);
        }

        self.persist_all(&transactions).await?;
        debug!("Removed {} transactions for asset {}", removed, asset_id);
        self.notify(vec![asset_id.to_string()]);
        Ok(removed)
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        Ok(Self::sorted_desc(self.load_all().await?))
    }

    async fn list_by_asset(&self, asset_id: &str) -> Result<Vec<Transaction>> {
        let transactions = self
            .load_all()
            .await?
            .into_iter()
            .filter(|t| t.asset_id == asset_id)
            .collect();
        Ok(Self::sorted_desc(transactions))
    }

    async fn list_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        let padded_start = start - Duration::days(1);
        let padded_end = end + Duration::days(1);
        let transactions = self
            .load_all()
            .await?
            .into_iter()
            .filter(|t| t.timestamp >= padded_start && t.timestamp < padded_end)
            .collect();
        Ok(Self::sorted_desc(transactions))
    }

    async fn statistics(&self) -> Result<LedgerStatistics> {
        let transactions = self.load_all().await?;
        Ok(LedgerStatistics::from_transactions(&transactions))
    }
}
