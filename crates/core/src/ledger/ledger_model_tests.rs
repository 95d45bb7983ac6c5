//! Tests for transaction ledger domain models.

#[cfg(test)]
mod tests {
    use crate::errors::ValidationError;
    use crate::ledger::ledger_model::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn sample_new(kind: TransactionKind, amount: &str, price: &str) -> NewTransaction {
        NewTransaction {
            asset_id: "bitcoin".to_string(),
            symbol: "BTC".to_string(),
            name: "Bitcoin".to_string(),
            kind,
            amount: amount.parse().unwrap(),
            price_per_unit: price.parse().unwrap(),
            timestamp: None,
            exchange: None,
            notes: None,
        }
    }

    fn sample_transaction(kind: TransactionKind, amount: &str, price: &str) -> Transaction {
        sample_new(kind, amount, price).into_transaction(
            "tx_1".to_string(),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
        )
    }

    // ============================================================================
    // TransactionKind Tests
    // ============================================================================

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TransactionKind::Buy).unwrap(), r#""buy""#);
        assert_eq!(serde_json::to_string(&TransactionKind::Sell).unwrap(), r#""sell""#);
    }

    #[test]
    fn test_kind_deserializes_lowercase() {
        let buy: TransactionKind = serde_json::from_str(r#""buy""#).unwrap();
        assert_eq!(buy, TransactionKind::Buy);
        let sell: TransactionKind = serde_json::from_str(r#""sell""#).unwrap();
        assert_eq!(sell, TransactionKind::Sell);
    }

    // ============================================================================
    // Validation Tests
    // ============================================================================

    #[test]
    fn test_valid_draft_passes() {
        assert!(sample_new(TransactionKind::Buy, "0.5", "45000").validate().is_ok());
    }

    #[test]
    fn test_zero_amount_rejected() {
        let result = sample_new(TransactionKind::Buy, "0", "45000").validate();
        assert!(matches!(result, Err(ValidationError::InvalidInput(msg)) if msg.contains("amount")));
    }

    #[test]
    fn test_negative_amount_rejected() {
        assert!(sample_new(TransactionKind::Sell, "-0.1", "45000").validate().is_err());
    }

    #[test]
    fn test_zero_price_rejected() {
        let result = sample_new(TransactionKind::Buy, "1", "0").validate();
        assert!(matches!(result, Err(ValidationError::InvalidInput(msg)) if msg.contains("Price")));
    }

    #[test]
    fn test_negative_price_rejected() {
        assert!(sample_new(TransactionKind::Buy, "1", "-45000").validate().is_err());
    }

    #[test]
    fn test_blank_asset_id_rejected() {
        let mut draft = sample_new(TransactionKind::Buy, "1", "45000");
        draft.asset_id = "  ".to_string();
        let result = draft.validate();
        assert!(matches!(result, Err(ValidationError::MissingField(field)) if field == "assetId"));
    }

    #[test]
    fn test_update_validates_same_rules() {
        let update = TransactionUpdate {
            id: "tx_1".to_string(),
            asset_id: "bitcoin".to_string(),
            symbol: "BTC".to_string(),
            name: "Bitcoin".to_string(),
            kind: TransactionKind::Buy,
            amount: dec!(0),
            price_per_unit: dec!(45000),
            timestamp: Utc::now(),
            exchange: None,
            notes: None,
        };
        assert!(update.validate().is_err());
    }

    // ============================================================================
    // Materialization Tests
    // ============================================================================

    #[test]
    fn test_into_transaction_applies_defaults() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let tx = sample_new(TransactionKind::Buy, "1", "45000")
            .into_transaction("tx_7".to_string(), now);

        assert_eq!(tx.id, "tx_7");
        assert_eq!(tx.timestamp, now);
        assert_eq!(tx.exchange, "Unknown");
        assert_eq!(tx.notes, None);
    }

    #[test]
    fn test_into_transaction_keeps_explicit_fields() {
        let executed = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        let mut draft = sample_new(TransactionKind::Sell, "2", "2500");
        draft.timestamp = Some(executed);
        draft.exchange = Some("Coinbase".to_string());
        draft.notes = Some("take profit".to_string());

        let tx = draft.into_transaction("tx_8".to_string(), Utc::now());
        assert_eq!(tx.timestamp, executed);
        assert_eq!(tx.exchange, "Coinbase");
        assert_eq!(tx.notes.as_deref(), Some("take profit"));
    }

    #[test]
    fn test_gross_value() {
        let tx = sample_transaction(TransactionKind::Buy, "0.5", "45000");
        assert_eq!(tx.gross_value(), dec!(22500));
    }

    // ============================================================================
    // Serialization Tests
    // ============================================================================

    #[test]
    fn test_transaction_serializes_camel_case() {
        let tx = sample_transaction(TransactionKind::Buy, "0.5", "45000");
        let json = serde_json::to_string(&tx).unwrap();

        assert!(json.contains(r#""assetId":"bitcoin""#));
        assert!(json.contains(r#""pricePerUnit""#));
        assert!(json.contains(r#""kind":"buy""#));
        // Absent notes are omitted entirely.
        assert!(!json.contains("notes"));
    }

    #[test]
    fn test_transaction_round_trips() {
        let mut tx = sample_transaction(TransactionKind::Sell, "1.25", "31000.50");
        tx.notes = Some("rebalance".to_string());

        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn test_new_transaction_deserializes_with_omitted_optionals() {
        let json = r#"{
            "assetId": "ethereum",
            "symbol": "ETH",
            "name": "Ethereum",
            "kind": "buy",
            "amount": 2.0,
            "pricePerUnit": 2500.0
        }"#;
        let draft: NewTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(draft.asset_id, "ethereum");
        assert_eq!(draft.timestamp, None);
        assert_eq!(draft.exchange, None);
    }

    // ============================================================================
    // LedgerStatistics Tests
    // ============================================================================

    #[test]
    fn test_statistics_for_empty_ledger() {
        let stats = LedgerStatistics::from_transactions(&[]);
        assert_eq!(stats.total_count, 0);
        assert_eq!(stats.buy_count, 0);
        assert_eq!(stats.sell_count, 0);
        assert_eq!(stats.net_investment, dec!(0));
    }

    #[test]
    fn test_statistics_splits_buys_and_sells() {
        let transactions = vec![
            sample_transaction(TransactionKind::Buy, "0.5", "45000"),
            sample_transaction(TransactionKind::Buy, "0.3", "47000"),
            sample_transaction(TransactionKind::Sell, "0.2", "50000"),
        ];

        let stats = LedgerStatistics::from_transactions(&transactions);
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.buy_count, 2);
        assert_eq!(stats.sell_count, 1);
        assert_eq!(stats.total_invested, dec!(36600));
        assert_eq!(stats.total_received, dec!(10000));
        assert_eq!(stats.net_investment, dec!(26600));
    }

    #[test]
    fn test_statistics_net_can_be_negative() {
        let transactions = vec![
            sample_transaction(TransactionKind::Buy, "1", "30000"),
            sample_transaction(TransactionKind::Sell, "1", "45000"),
        ];
        let stats = LedgerStatistics::from_transactions(&transactions);
        assert_eq!(stats.net_investment, dec!(-15000));
    }
}
