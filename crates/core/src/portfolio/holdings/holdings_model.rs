use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-asset aggregate derived from the ledger, before pricing.
///
/// Carries the net amount and the depleted cost basis; everything that
/// needs a current price lives on [`Holding`].
#[derive(Debug, Clone, PartialEq)]
pub struct AssetPosition {
    pub asset_id: String,
    pub symbol: String,
    pub name: String,
    pub net_amount: Decimal,
    pub total_invested: Decimal,
}

impl AssetPosition {
    /// Average acquisition price of the position, zero for a zero amount.
    pub fn average_price(&self) -> Decimal {
        if self.net_amount.is_zero() {
            Decimal::ZERO
        } else {
            self.total_invested.abs() / self.net_amount
        }
    }

    /// Attach a resolved price and produce the display-ready holding.
    pub fn into_holding(self, current_price: Decimal, icon_url: Option<String>) -> Holding {
        let average_price = self.average_price();
        let current_value = self.net_amount * current_price;
        let profit_loss = current_value - self.total_invested;
        let profit_loss_percentage = if self.total_invested.is_zero() {
            Decimal::ZERO
        } else {
            profit_loss / self.total_invested.abs() * Decimal::ONE_HUNDRED
        };

        Holding {
            asset_id: self.asset_id,
            symbol: self.symbol,
            name: self.name,
            icon_url,
            net_amount: self.net_amount,
            total_invested: self.total_invested,
            average_price,
            current_price,
            current_value,
            profit_loss,
            profit_loss_percentage,
        }
    }
}

/// Position view model with resolved pricing, recomputed on demand.
///
/// Never persisted as a source of truth; the ledger is, and holdings are
/// rebuilt from it on every valuation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub asset_id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Net quantity held, always positive in the published view.
    pub net_amount: Decimal,
    /// Remaining cost basis after average-cost depletion of sells.
    pub total_invested: Decimal,
    pub average_price: Decimal,
    pub current_price: Decimal,
    /// `net_amount * current_price`.
    pub current_value: Decimal,
    /// `current_value - total_invested`.
    pub profit_loss: Decimal,
    /// Percent gain over `total_invested`, zero when nothing is invested.
    pub profit_loss_percentage: Decimal,
}
