//! Pure aggregation of ledger transactions into per-asset positions.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::ledger::{Transaction, TransactionKind};
use crate::portfolio::holdings::AssetPosition;

/// Chronological fold of all transactions into per-asset positions.
fn fold_positions(transactions: &[Transaction]) -> HashMap<String, AssetPosition> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let mut positions: HashMap<String, AssetPosition> = HashMap::new();

    for tx in ordered {
        let position = positions
            .entry(tx.asset_id.clone())
            .or_insert_with(|| AssetPosition {
                asset_id: tx.asset_id.clone(),
                symbol: tx.symbol.clone(),
                name: tx.name.clone(),
                net_amount: Decimal::ZERO,
                total_invested: Decimal::ZERO,
            });

        // Display fields follow the most recent transaction.
        position.symbol = tx.symbol.clone();
        position.name = tx.name.clone();

        match tx.kind {
            TransactionKind::Buy => {
                position.net_amount += tx.amount;
                position.total_invested += tx.gross_value();
            }
            TransactionKind::Sell => {
                let net_before = position.net_amount;
                if net_before > Decimal::ZERO {
                    let mut released = position.total_invested * tx.amount / net_before;
                    if released > position.total_invested {
                        released = position.total_invested;
                    }
                    position.total_invested -= released;
                }
                position.net_amount -= tx.amount;
            }
        }
    }

    positions
}

/// Folds transactions into per-asset positions using average-cost depletion.
///
/// Transactions are processed in timestamp order regardless of input order.
/// Buys add `amount * price` to the invested total; sells reduce it by the
/// fraction of the position sold (`sell_amount / net_before`), never below
/// zero. This is average-cost accounting, not lot tracking: selling half
/// the position always releases half the basis.
///
/// Positions whose net amount ends at or below zero are dropped from the
/// result; they are fully divested or recorded inconsistently, and neither
/// belongs in a valuation.
pub fn aggregate_positions(transactions: &[Transaction]) -> Vec<AssetPosition> {
    let mut result: Vec<AssetPosition> = fold_positions(transactions)
        .into_values()
        .filter(|p| p.net_amount > Decimal::ZERO)
        .collect();
    result.sort_by(|a, b| a.asset_id.cmp(&b.asset_id));
    result
}

/// Position for a single asset, including net amounts at or below zero that
/// the published view drops. Used for spot checks and diagnostics.
pub fn position_for(transactions: &[Transaction], asset_id: &str) -> Option<AssetPosition> {
    fold_positions(transactions).remove(asset_id)
}
