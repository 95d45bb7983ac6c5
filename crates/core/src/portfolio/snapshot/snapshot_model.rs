use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which code path produced a snapshot. Recorded for diagnostics so an
/// operator can tell a network refresh from a cache-only recalculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    /// Full recalculation with live price resolution.
    Calculated,
    /// Recalculation limited to cached and average prices.
    CacheOnlyCalculation,
    /// Loaded back from persistence, not freshly computed.
    Restored,
    /// User-triggered refresh override.
    ManualRefresh,
    /// Cooldown-driven background refresh.
    ScheduledRefresh,
}

/// The canonical persisted record of last-known portfolio value.
///
/// `integrity_hash` covers the value/invested/P&L triple plus the format
/// version; it is recomputed and checked on every load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlSnapshot {
    pub total_value: Decimal,
    pub total_invested: Decimal,
    pub profit_loss: Decimal,
    pub percentage_change: Decimal,
    pub transaction_count: usize,
    pub holdings_count: usize,
    /// When this record was written.
    pub saved_at: DateTime<Utc>,
    /// When the underlying numbers were computed.
    pub calculated_at: DateTime<Utc>,
    pub integrity_hash: String,
    /// Unique token per write, time-ordered.
    pub write_id: String,
    pub source: SnapshotSource,
    /// Free-form diagnostic payload.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Input for a snapshot save. The service stamps `saved_at`, the write id
/// and the integrity hash itself.
#[derive(Debug, Clone)]
pub struct SnapshotInput {
    pub total_value: Decimal,
    pub total_invested: Decimal,
    pub profit_loss: Decimal,
    pub percentage_change: Decimal,
    pub transaction_count: usize,
    pub holdings_count: usize,
    pub calculated_at: DateTime<Utc>,
    pub source: SnapshotSource,
    pub details: Option<Value>,
}

/// One snapshot reduced to its chartable numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub total_value: Decimal,
    pub total_invested: Decimal,
    pub profit_loss: Decimal,
    pub percentage_change: Decimal,
    pub write_id: String,
}

/// Result of a pure P&L consistency check against the definitional formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyReport {
    pub is_valid: bool,
    /// `total_value - total_invested`.
    pub expected_profit_loss: Decimal,
    /// The P&L value that was actually supplied.
    pub actual_profit_loss: Decimal,
    pub difference: Decimal,
    pub checked_at: DateTime<Utc>,
}

/// How long it has been since a snapshot was last written. Callers use
/// this to decide whether a network refresh should jump the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InactivityReport {
    pub has_data: bool,
    pub is_first_use: bool,
    pub inactive_hours: i64,
    pub is_long_inactive: bool,
    pub message: String,
}

/// Outcome of a clear-all pass over the P&L keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearOutcome {
    pub cleared_keys: usize,
    pub backup_created: bool,
}

/// Counters describing how often the self-healing paths have fired since
/// the service was constructed. A nonzero `corrections` count means stored
/// data drifted from the definitional P&L formula and was rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotStoreStats {
    pub saves: u64,
    pub integrity_rejections: u64,
    pub write_failures: u64,
    pub backup_restores: u64,
    pub corrections: u64,
}
