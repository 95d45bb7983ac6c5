//! Transaction ledger domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_EXCHANGE;
use crate::errors::ValidationError;

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Buy,
    Sell,
}

/// A recorded buy or sell of a crypto asset.
///
/// `asset_id` is the market data provider's canonical identifier
/// (e.g. "bitcoin"); `symbol` and `name` are denormalized for display so
/// the ledger renders without a market data lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub asset_id: String,
    pub symbol: String,
    pub name: String,
    pub kind: TransactionKind,
    /// Quantity of the asset, always positive.
    pub amount: Decimal,
    /// Price per unit at execution time, always positive.
    pub price_per_unit: Decimal,
    pub timestamp: DateTime<Utc>,
    pub exchange: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Transaction {
    /// Gross value of this transaction (amount x price).
    pub fn gross_value(&self) -> Decimal {
        self.amount * self.price_per_unit
    }
}

/// Input for creating a transaction. The service assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub asset_id: String,
    pub symbol: String,
    pub name: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub price_per_unit: Decimal,
    /// Execution time; defaults to now when omitted.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Input for replacing an existing transaction. Full replace, same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    pub id: String,
    pub asset_id: String,
    pub symbol: String,
    pub name: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub price_per_unit: Decimal,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn validate_fields(
    asset_id: &str,
    amount: Decimal,
    price_per_unit: Decimal,
) -> Result<(), ValidationError> {
    if asset_id.trim().is_empty() {
        return Err(ValidationError::MissingField("assetId".to_string()));
    }
    if amount <= Decimal::ZERO {
        return Err(ValidationError::InvalidInput(
            "Transaction amount must be positive".to_string(),
        ));
    }
    if price_per_unit <= Decimal::ZERO {
        return Err(ValidationError::InvalidInput(
            "Price per unit must be positive".to_string(),
        ));
    }
    Ok(())
}

impl NewTransaction {
    /// Rejects non-positive amounts and prices before anything is written.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.asset_id, self.amount, self.price_per_unit)
    }

    /// Materialize into a full transaction with the given id.
    pub fn into_transaction(self, id: String, now: DateTime<Utc>) -> Transaction {
        Transaction {
            id,
            asset_id: self.asset_id,
            symbol: self.symbol,
            name: self.name,
            kind: self.kind,
            amount: self.amount,
            price_per_unit: self.price_per_unit,
            timestamp: self.timestamp.unwrap_or(now),
            exchange: self
                .exchange
                .unwrap_or_else(|| DEFAULT_EXCHANGE.to_string()),
            notes: self.notes,
        }
    }
}

impl TransactionUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.asset_id, self.amount, self.price_per_unit)
    }

    /// Materialize the replacement, keeping the original id.
    pub fn into_transaction(self) -> Transaction {
        Transaction {
            id: self.id,
            asset_id: self.asset_id,
            symbol: self.symbol,
            name: self.name,
            kind: self.kind,
            amount: self.amount,
            price_per_unit: self.price_per_unit,
            timestamp: self.timestamp,
            exchange: self
                .exchange
                .unwrap_or_else(|| DEFAULT_EXCHANGE.to_string()),
            notes: self.notes,
        }
    }
}

/// Aggregate counters over the whole ledger, computed in a single pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStatistics {
    pub total_count: usize,
    pub buy_count: usize,
    pub sell_count: usize,
    /// Sum of gross values of buys.
    pub total_invested: Decimal,
    /// Sum of gross values of sells.
    pub total_received: Decimal,
    /// `total_invested - total_received`.
    pub net_investment: Decimal,
}

impl LedgerStatistics {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let mut stats = Self {
            total_count: transactions.len(),
            buy_count: 0,
            sell_count: 0,
            total_invested: Decimal::ZERO,
            total_received: Decimal::ZERO,
            net_investment: Decimal::ZERO,
        };

        for tx in transactions {
            match tx.kind {
                TransactionKind::Buy => {
                    stats.buy_count += 1;
                    stats.total_invested += tx.gross_value();
                }
                TransactionKind::Sell => {
                    stats.sell_count += 1;
                    stats.total_received += tx.gross_value();
                }
            }
        }
        stats.net_investment = stats.total_invested - stats.total_received;
        stats
    }
}
