//! Tests for snapshot domain models.

#[cfg(test)]
mod tests {
    use crate::constants::SNAPSHOT_FORMAT_VERSION;
    use crate::portfolio::snapshot::{
        compute_integrity_hash, PnlSnapshot, SnapshotSource, TimeSeriesPoint,
    };
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn sample_snapshot() -> PnlSnapshot {
        let saved_at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        PnlSnapshot {
            total_value: dec!(40000),
            total_invested: dec!(36600),
            profit_loss: dec!(3400),
            percentage_change: dec!(9.29),
            transaction_count: 2,
            holdings_count: 1,
            saved_at,
            calculated_at: saved_at,
            integrity_hash: compute_integrity_hash(
                dec!(40000),
                dec!(36600),
                dec!(3400),
                SNAPSHOT_FORMAT_VERSION,
            ),
            write_id: "0190a8b0-0000-7000-8000-000000000001".to_string(),
            source: SnapshotSource::Calculated,
            details: None,
        }
    }

    #[test]
    fn test_source_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SnapshotSource::CacheOnlyCalculation).unwrap(),
            r#""cache_only_calculation""#
        );
        assert_eq!(
            serde_json::to_string(&SnapshotSource::ManualRefresh).unwrap(),
            r#""manual_refresh""#
        );
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let json = serde_json::to_string(&sample_snapshot()).unwrap();
        assert!(json.contains(r#""totalValue""#));
        assert!(json.contains(r#""totalInvested""#));
        assert!(json.contains(r#""profitLoss""#));
        assert!(json.contains(r#""percentageChange""#));
        assert!(json.contains(r#""integrityHash""#));
        assert!(json.contains(r#""writeId""#));
        // Absent details are omitted.
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_snapshot_round_trips() {
        let mut snapshot = sample_snapshot();
        snapshot.details = Some(serde_json::json!({ "priceSource": "cache" }));

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: PnlSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_snapshot_missing_required_field_fails_to_parse() {
        let mut value = serde_json::to_value(sample_snapshot()).unwrap();
        value.as_object_mut().unwrap().remove("integrityHash");

        let result: Result<PnlSnapshot, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }

    #[test]
    fn test_time_series_point_round_trips() {
        let point = TimeSeriesPoint {
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            total_value: dec!(1000),
            total_invested: dec!(900),
            profit_loss: dec!(100),
            percentage_change: dec!(11.11),
            write_id: "w1".to_string(),
        };

        let json = serde_json::to_string(&point).unwrap();
        assert!(json.contains(r#""writeId":"w1""#));
        let back: TimeSeriesPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, point);
    }
}
