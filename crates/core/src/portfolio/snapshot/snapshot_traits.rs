use async_trait::async_trait;
use chrono::Duration;
use rust_decimal::Decimal;

use crate::portfolio::snapshot::{
    ClearOutcome, ConsistencyReport, InactivityReport, PnlSnapshot, SnapshotInput,
    SnapshotStoreStats, TimeSeriesPoint,
};

/// Durable P&L snapshot persistence.
///
/// Every method absorbs internal failures and degrades to `false`, `None`,
/// or empty rather than erroring: a dashboard must keep rendering through
/// storage hiccups. Callers that need to know why something degraded read
/// the logs and [`SnapshotStoreStats`].
#[async_trait]
pub trait SnapshotServiceTrait: Send + Sync {
    /// Persist a new snapshot. Returns whether the primary write landed.
    ///
    /// The previous snapshot is backed up first and restored if the write
    /// fails. A successful write also appends a time-series point; a
    /// failure there is logged but does not fail the save.
    async fn save_snapshot(&self, input: SnapshotInput) -> bool;

    /// Load the current snapshot, repaired to internal consistency.
    ///
    /// `None` means no usable data: first run, or corruption that the
    /// backup (when `use_backup_if_corrupted` is set) could not cover.
    async fn load_snapshot(&self, use_backup_if_corrupted: bool) -> Option<PnlSnapshot>;

    /// Pure P&L consistency check with `0.01` tolerance. Does not mutate
    /// the stored snapshot; the report is cached under its own key.
    async fn validate_consistency(
        &self,
        total_value: Decimal,
        total_invested: Decimal,
        profit_loss: Decimal,
    ) -> ConsistencyReport;

    /// Chronologically sorted time series, optionally limited to a
    /// trailing period.
    async fn get_time_series(&self, period: Option<Duration>) -> Vec<TimeSeriesPoint>;

    /// How stale the stored snapshot is.
    async fn check_inactivity(&self) -> InactivityReport;

    /// Remove all P&L keys, optionally archiving them first. When the
    /// requested archive cannot be written nothing is cleared.
    async fn clear_all(&self, create_backup: bool) -> ClearOutcome;

    /// Self-healing counters since construction.
    fn stats(&self) -> SnapshotStoreStats;
}
