//! Property-based tests for the holdings calculator.
//!
//! These tests verify that average-cost aggregation invariants hold across
//! randomly generated transaction histories, using the `proptest` crate for
//! test case generation.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use coinfolio_core::ledger::{Transaction, TransactionKind};
use coinfolio_core::portfolio::holdings::{aggregate_positions, position_for};

// =============================================================================
// Generators
// =============================================================================

/// Tolerance for comparing decimals produced through division.
const EPSILON: Decimal = dec!(0.0001);

/// Generates a random transaction kind.
fn arb_kind() -> impl Strategy<Value = TransactionKind> {
    prop_oneof![Just(TransactionKind::Buy), Just(TransactionKind::Sell)]
}

/// Generates an asset id from a small pool so positions actually collide.
fn arb_asset_id() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("bitcoin"),
        Just("ethereum"),
        Just("solana"),
        Just("cardano"),
    ]
}

/// Generates a positive amount with four decimal places, up to 100 units.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..=1_000_000).prop_map(|n| Decimal::new(n, 4))
}

/// Generates a positive price with two decimal places, up to 100k.
fn arb_price() -> impl Strategy<Value = Decimal> {
    (1i64..=10_000_000).prop_map(|n| Decimal::new(n, 2))
}

fn make_transaction(
    seq: usize,
    asset_id: &str,
    kind: TransactionKind,
    amount: Decimal,
    price: Decimal,
) -> Transaction {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Transaction {
        id: format!("tx_{}", seq + 1),
        asset_id: asset_id.to_string(),
        symbol: asset_id[..3].to_uppercase(),
        name: asset_id.to_string(),
        kind,
        amount,
        price_per_unit: price,
        // Distinct, increasing timestamps so generation order is
        // chronological order.
        timestamp: base + Duration::minutes(seq as i64),
        exchange: "Unknown".to_string(),
        notes: None,
    }
}

/// Generates a transaction history with distinct increasing timestamps.
fn arb_history(max_len: usize) -> impl Strategy<Value = Vec<Transaction>> {
    proptest::collection::vec(
        (arb_asset_id(), arb_kind(), arb_amount(), arb_price()),
        0..=max_len,
    )
    .prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(seq, (asset_id, kind, amount, price))| {
                make_transaction(seq, asset_id, kind, amount, price)
            })
            .collect()
    })
}

/// Generates a buys-only transaction history.
fn arb_buy_history(max_len: usize) -> impl Strategy<Value = Vec<Transaction>> {
    proptest::collection::vec((arb_asset_id(), arb_amount(), arb_price()), 1..=max_len).prop_map(
        |entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(seq, (asset_id, amount, price))| {
                    make_transaction(seq, asset_id, TransactionKind::Buy, amount, price)
                })
                .collect()
        },
    )
}

fn asset_ids_in(transactions: &[Transaction]) -> HashSet<String> {
    transactions.iter().map(|tx| tx.asset_id.clone()).collect()
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The invested basis can never go negative, no matter how sells and
    /// buys interleave. Overselling clamps the released basis at what is
    /// actually invested.
    #[test]
    fn prop_invested_basis_never_negative(history in arb_history(40)) {
        for asset_id in asset_ids_in(&history) {
            let position = position_for(&history, &asset_id)
                .expect("every traded asset has a position");
            prop_assert!(
                position.total_invested >= Decimal::ZERO,
                "invested basis for {} went negative: {}",
                asset_id,
                position.total_invested
            );
        }
    }

    /// The published holdings view only ever contains positions with a
    /// strictly positive net amount, sorted by asset id.
    #[test]
    fn prop_published_positions_positive_and_sorted(history in arb_history(40)) {
        let positions = aggregate_positions(&history);

        for position in &positions {
            prop_assert!(position.net_amount > Decimal::ZERO);
        }
        for pair in positions.windows(2) {
            prop_assert!(pair[0].asset_id < pair[1].asset_id);
        }
    }

    /// Net amount is the plain signed sum of buys minus sells. Clamping
    /// applies to the invested basis only, never to quantities.
    #[test]
    fn prop_net_amount_is_signed_sum(history in arb_history(40)) {
        let mut expected: HashMap<String, Decimal> = HashMap::new();
        for tx in &history {
            let entry = expected.entry(tx.asset_id.clone()).or_default();
            match tx.kind {
                TransactionKind::Buy => *entry += tx.amount,
                TransactionKind::Sell => *entry -= tx.amount,
            }
        }

        for (asset_id, net) in expected {
            let position = position_for(&history, &asset_id)
                .expect("every traded asset has a position");
            prop_assert_eq!(position.net_amount, net);
        }
    }

    /// With buys only, the position is the exact sum of amounts and gross
    /// values; nothing is released or clamped.
    #[test]
    fn prop_buys_only_sum_exactly(history in arb_buy_history(30)) {
        let mut expected_net: HashMap<String, Decimal> = HashMap::new();
        let mut expected_invested: HashMap<String, Decimal> = HashMap::new();
        for tx in &history {
            *expected_net.entry(tx.asset_id.clone()).or_default() += tx.amount;
            *expected_invested.entry(tx.asset_id.clone()).or_default() += tx.gross_value();
        }

        let positions = aggregate_positions(&history);
        prop_assert_eq!(positions.len(), expected_net.len());
        for position in positions {
            prop_assert_eq!(&position.net_amount, &expected_net[&position.asset_id]);
            prop_assert_eq!(
                &position.total_invested,
                &expected_invested[&position.asset_id]
            );
        }
    }

    /// Selling a fraction of a position releases the same fraction of the
    /// basis: after selling S out of A units bought at price P, the
    /// remaining basis is (A - S) * P and the average price is still P.
    #[test]
    fn prop_sell_releases_proportional_basis(
        amount in arb_amount(),
        price in arb_price(),
        fraction_bp in 1u32..10_000,
    ) {
        let sell_amount = amount * Decimal::new(fraction_bp as i64, 4);
        prop_assume!(sell_amount > Decimal::ZERO && sell_amount < amount);

        let history = vec![
            make_transaction(0, "bitcoin", TransactionKind::Buy, amount, price),
            make_transaction(1, "bitcoin", TransactionKind::Sell, sell_amount, price),
        ];

        let position = position_for(&history, "bitcoin").unwrap();
        let expected_invested = (amount - sell_amount) * price;

        prop_assert!((position.net_amount - (amount - sell_amount)).abs() < EPSILON);
        prop_assert!(
            (position.total_invested - expected_invested).abs() < EPSILON,
            "remaining basis {} should be near {}",
            position.total_invested,
            expected_invested
        );
        prop_assert!((position.average_price() - price).abs() < EPSILON);
    }

    /// Selling everything drops the position from the published view and
    /// leaves a zero basis behind it.
    #[test]
    fn prop_full_divestment_drops_position(history in arb_buy_history(10)) {
        let total: Decimal = history
            .iter()
            .filter(|tx| tx.asset_id == "bitcoin")
            .map(|tx| tx.amount)
            .sum();
        prop_assume!(total > Decimal::ZERO);

        let mut history = history;
        let seq = history.len();
        history.push(make_transaction(
            seq,
            "bitcoin",
            TransactionKind::Sell,
            total,
            dec!(50000),
        ));

        let positions = aggregate_positions(&history);
        prop_assert!(positions.iter().all(|p| p.asset_id != "bitcoin"));

        let position = position_for(&history, "bitcoin").unwrap();
        prop_assert_eq!(position.net_amount, Decimal::ZERO);
        prop_assert_eq!(position.total_invested, Decimal::ZERO);
    }

    /// Input order does not matter; the fold is driven by timestamps.
    #[test]
    fn prop_input_order_irrelevant(history in arb_history(40)) {
        let mut reversed = history.clone();
        reversed.reverse();

        prop_assert_eq!(aggregate_positions(&history), aggregate_positions(&reversed));
    }

    /// For every published position, average price times net amount
    /// reproduces the invested basis.
    #[test]
    fn prop_average_price_consistent(history in arb_history(40)) {
        for position in aggregate_positions(&history) {
            let reconstructed = position.average_price() * position.net_amount;
            prop_assert!(
                (reconstructed - position.total_invested).abs() < EPSILON,
                "average price * net {} should be near invested {}",
                reconstructed,
                position.total_invested
            );
        }
    }
}
