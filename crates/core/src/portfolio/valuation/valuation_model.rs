use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::portfolio::holdings::Holding;
use crate::portfolio::snapshot::integrity::percentage_change;
use crate::portfolio::snapshot::PnlSnapshot;

/// Aggregate portfolio totals derived from a set of valued holdings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_value: Decimal,
    pub total_invested: Decimal,
    pub profit_loss: Decimal,
    pub percentage_change: Decimal,
    pub holdings_count: usize,
    /// When the prices behind this summary were last refreshed.
    pub last_updated: DateTime<Utc>,
    pub calculated_at: DateTime<Utc>,
}

impl PortfolioSummary {
    /// Totals over valued holdings. Invested amounts are summed as absolute
    /// values so a stray negative basis cannot hide inside the aggregate.
    pub fn from_holdings(holdings: &[Holding], now: DateTime<Utc>) -> Self {
        let total_value: Decimal = holdings.iter().map(|h| h.current_value).sum();
        let total_invested: Decimal = holdings.iter().map(|h| h.total_invested.abs()).sum();
        let profit_loss = total_value - total_invested;

        Self {
            total_value,
            total_invested,
            profit_loss,
            percentage_change: percentage_change(profit_loss, total_invested),
            holdings_count: holdings.len(),
            last_updated: now,
            calculated_at: now,
        }
    }

    /// All-zero summary for an empty ledger.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            total_value: Decimal::ZERO,
            total_invested: Decimal::ZERO,
            profit_loss: Decimal::ZERO,
            percentage_change: Decimal::ZERO,
            holdings_count: 0,
            last_updated: now,
            calculated_at: now,
        }
    }
}

impl From<&PnlSnapshot> for PortfolioSummary {
    fn from(snapshot: &PnlSnapshot) -> Self {
        Self {
            total_value: snapshot.total_value,
            total_invested: snapshot.total_invested,
            profit_loss: snapshot.profit_loss,
            percentage_change: snapshot.percentage_change,
            holdings_count: snapshot.holdings_count,
            last_updated: snapshot.saved_at,
            calculated_at: snapshot.calculated_at,
        }
    }
}

/// Payload broadcast to subscribers after every completed valuation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioUpdate {
    pub holdings: Vec<Holding>,
    pub summary: PortfolioSummary,
}

/// In-memory cache slot holding the latest computed value and its timestamp.
#[derive(Debug, Clone)]
pub struct CachedValue<T> {
    value: Option<T>,
    updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for CachedValue<T> {
    fn default() -> Self {
        Self {
            value: None,
            updated_at: None,
        }
    }
}

impl<T: Clone> CachedValue<T> {
    pub fn set(&mut self, value: T, now: DateTime<Utc>) {
        self.value = Some(value);
        self.updated_at = Some(now);
    }

    pub fn get(&self) -> Option<T> {
        self.value.clone()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn invalidate(&mut self) {
        self.value = None;
        self.updated_at = None;
    }
}
