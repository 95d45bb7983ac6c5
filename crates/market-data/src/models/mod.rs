//! Market data domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A crypto asset as listed by the market data provider.
///
/// `id` is the provider's canonical identifier (e.g. "bitcoin"), which is
/// also the identifier the portfolio ledger stores on transactions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAsset {
    pub id: String,
    /// Ticker symbol, uppercased (e.g. "BTC").
    pub symbol: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Latest known spot price in the quote currency.
    pub current_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<Decimal>,
    /// 24h price change in percent, as reported by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_change_24h: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl MarketAsset {
    /// Case-insensitive match against id, symbol or name prefix/substring.
    pub fn matches_query(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return false;
        }
        self.id.to_lowercase().contains(&q)
            || self.symbol.to_lowercase().contains(&q)
            || self.name.to_lowercase().contains(&q)
    }
}

/// A single point in a historical price series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}
