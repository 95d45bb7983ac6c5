//! Durable snapshot persistence with backup, auto-repair, and time series.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::constants::{
    LONG_INACTIVITY_HOURS, PL_TOLERANCE, SNAPSHOT_FORMAT_VERSION, TIME_SERIES_MIN_POINTS,
    TIME_SERIES_WINDOW_DAYS,
};
use crate::portfolio::snapshot::integrity::{self, compute_integrity_hash};
use crate::portfolio::snapshot::{
    ClearOutcome, ConsistencyReport, InactivityReport, PnlSnapshot, SnapshotInput,
    SnapshotServiceTrait, SnapshotStoreStats, TimeSeriesPoint,
};
use crate::storage::{KeyValueStore, UserKeys};

#[derive(Default)]
struct StatCounters {
    saves: AtomicU64,
    integrity_rejections: AtomicU64,
    write_failures: AtomicU64,
    backup_restores: AtomicU64,
    corrections: AtomicU64,
}

enum ReadOutcome {
    Valid(PnlSnapshot),
    Absent,
    Invalid,
}

/// Single source of truth for "what was the portfolio worth last time we
/// checked," durable across restarts and self-healing against corruption.
pub struct SnapshotService {
    store: Arc<dyn KeyValueStore>,
    keys: UserKeys,
    stats: StatCounters,
}

impl SnapshotService {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: UserKeys) -> Self {
        Self {
            store,
            keys,
            stats: StatCounters::default(),
        }
    }

    /// Read and validate one snapshot slot.
    async fn read_slot(&self, key: &str, now: DateTime<Utc>) -> ReadOutcome {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return ReadOutcome::Absent,
            Err(e) => {
                warn!("Snapshot read under '{}' failed: {}", key, e);
                return ReadOutcome::Invalid;
            }
        };

        let snapshot: PnlSnapshot = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Snapshot under '{}' failed to parse: {}", key, e);
                return ReadOutcome::Invalid;
            }
        };

        match integrity::validate(&snapshot, now) {
            Ok(()) => ReadOutcome::Valid(snapshot),
            Err(issue) => {
                warn!("Snapshot under '{}' rejected: {}", key, issue);
                ReadOutcome::Invalid
            }
        }
    }

    /// Apply the repair pass and persist any correction back to the
    /// primary slot. The caller always gets a consistent record.
    async fn repair_and_settle(&self, snapshot: PnlSnapshot, from_backup: bool) -> PnlSnapshot {
        let (settled, was_repaired) = match integrity::repair(&snapshot) {
            Some(corrected) => {
                warn!(
                    "Auto-corrected stored P&L drift: stored {} expected {}",
                    snapshot.profit_loss, corrected.profit_loss
                );
                self.stats.corrections.fetch_add(1, Ordering::Relaxed);
                (corrected, true)
            }
            None => (snapshot, false),
        };

        // Write back so the next load does not repeat the recovery.
        if was_repaired || from_backup {
            self.persist_primary(&settled).await;
        }
        settled
    }

    async fn persist_primary(&self, snapshot: &PnlSnapshot) {
        match serde_json::to_string(snapshot) {
            Ok(serialized) => {
                if let Err(e) = self.store.set(&self.keys.snapshot(), &serialized).await {
                    warn!("Failed to persist settled snapshot: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize settled snapshot: {}", e),
        }
    }

    async fn append_time_series_point(&self, snapshot: &PnlSnapshot) {
        let key = self.keys.time_series();
        let mut points = match self.store.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<TimeSeriesPoint>>(&raw) {
                Ok(points) => points,
                Err(e) => {
                    warn!("Time series failed to parse, starting fresh: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Time series read failed, starting fresh: {}", e);
                Vec::new()
            }
        };

        points.push(TimeSeriesPoint {
            timestamp: snapshot.saved_at,
            total_value: snapshot.total_value,
            total_invested: snapshot.total_invested,
            profit_loss: snapshot.profit_loss,
            percentage_change: snapshot.percentage_change,
            write_id: snapshot.write_id.clone(),
        });
        let points = prune_series(points, snapshot.saved_at);

        match serde_json::to_string(&points) {
            Ok(serialized) => {
                if let Err(e) = self.store.set(&key, &serialized).await {
                    warn!("Time series append failed: {}", e);
                }
            }
            Err(e) => warn!("Time series serialization failed: {}", e),
        }
    }
}

/// Drops points outside the rolling window, but never below the floor of
/// most-recent points, so a dormant portfolio keeps a chartable history.
fn prune_series(mut points: Vec<TimeSeriesPoint>, now: DateTime<Utc>) -> Vec<TimeSeriesPoint> {
    points.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    let cutoff = now - Duration::days(TIME_SERIES_WINDOW_DAYS);
    let in_window = points.iter().filter(|p| p.timestamp >= cutoff).count();
    let keep = in_window.max(TIME_SERIES_MIN_POINTS).min(points.len());
    points.split_off(points.len() - keep)
}

#[async_trait]
impl SnapshotServiceTrait for SnapshotService {
    async fn save_snapshot(&self, input: SnapshotInput) -> bool {
        let now = Utc::now();
        let record = PnlSnapshot {
            total_value: input.total_value,
            total_invested: input.total_invested,
            profit_loss: input.profit_loss,
            percentage_change: input.percentage_change,
            transaction_count: input.transaction_count,
            holdings_count: input.holdings_count,
            saved_at: now,
            calculated_at: input.calculated_at,
            integrity_hash: compute_integrity_hash(
                input.total_value,
                input.total_invested,
                input.profit_loss,
                SNAPSHOT_FORMAT_VERSION,
            ),
            write_id: Uuid::now_v7().to_string(),
            source: input.source,
            details: input.details,
        };

        // Integrity gate, checked before any write.
        if let Err(issue) = integrity::validate(&record, now) {
            warn!("Snapshot rejected before write: {}", issue);
            self.stats.integrity_rejections.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let serialized = match serde_json::to_string(&record) {
            Ok(serialized) => serialized,
            Err(e) => {
                error!("Snapshot serialization failed: {}", e);
                self.stats.write_failures.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        };

        // Back up the current blob so a failed write can be rolled back.
        let previous = match self.store.get(&self.keys.snapshot()).await {
            Ok(previous) => previous,
            Err(e) => {
                warn!("Could not read current snapshot for backup: {}", e);
                None
            }
        };
        if let Some(ref raw) = previous {
            if let Err(e) = self.store.set(&self.keys.snapshot_backup(), raw).await {
                warn!("Snapshot backup write failed: {}", e);
            }
        }

        if let Err(e) = self.store.set(&self.keys.snapshot(), &serialized).await {
            error!("Snapshot write failed: {}", e);
            self.stats.write_failures.fetch_add(1, Ordering::Relaxed);
            if let Some(raw) = previous {
                if self.store.set(&self.keys.snapshot(), &raw).await.is_ok() {
                    self.stats.backup_restores.fetch_add(1, Ordering::Relaxed);
                    info!("Restored previous snapshot after failed write");
                } else {
                    error!("Could not restore previous snapshot after failed write");
                }
            }
            return false;
        }

        self.append_time_series_point(&record).await;
        self.stats.saves.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Saved snapshot {}: value {} invested {} P&L {} ({:?})",
            record.write_id, record.total_value, record.total_invested, record.profit_loss,
            record.source
        );
        true
    }

    async fn load_snapshot(&self, use_backup_if_corrupted: bool) -> Option<PnlSnapshot> {
        let now = Utc::now();

        match self.read_slot(&self.keys.snapshot(), now).await {
            ReadOutcome::Valid(snapshot) => {
                return Some(self.repair_and_settle(snapshot, false).await)
            }
            ReadOutcome::Absent => {
                debug!("No snapshot stored yet");
                return None;
            }
            ReadOutcome::Invalid => {}
        }

        if !use_backup_if_corrupted {
            return None;
        }

        match self.read_slot(&self.keys.snapshot_backup(), now).await {
            ReadOutcome::Valid(snapshot) => {
                info!("Recovered snapshot from backup slot");
                self.stats.backup_restores.fetch_add(1, Ordering::Relaxed);
                Some(self.repair_and_settle(snapshot, true).await)
            }
            _ => None,
        }
    }

    async fn validate_consistency(
        &self,
        total_value: Decimal,
        total_invested: Decimal,
        profit_loss: Decimal,
    ) -> ConsistencyReport {
        let expected_profit_loss = total_value - total_invested;
        let difference = (profit_loss - expected_profit_loss).abs();
        let report = ConsistencyReport {
            is_valid: difference <= PL_TOLERANCE,
            expected_profit_loss,
            actual_profit_loss: profit_loss,
            difference,
            checked_at: Utc::now(),
        };

        if !report.is_valid {
            warn!(
                "P&L consistency mismatch: stored {} expected {} (diff {})",
                profit_loss, expected_profit_loss, difference
            );
        }

        // Cache the report; failures only cost the cached copy.
        if let Ok(serialized) = serde_json::to_string(&report) {
            if let Err(e) = self.store.set(&self.keys.consistency_check(), &serialized).await {
                warn!("Consistency report cache write failed: {}", e);
            }
        }
        report
    }

    async fn get_time_series(&self, period: Option<Duration>) -> Vec<TimeSeriesPoint> {
        let raw = match self.store.get(&self.keys.time_series()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Time series read failed: {}", e);
                return Vec::new();
            }
        };

        let mut points: Vec<TimeSeriesPoint> = match serde_json::from_str(&raw) {
            Ok(points) => points,
            Err(e) => {
                warn!("Time series failed to parse: {}", e);
                return Vec::new();
            }
        };

        if let Some(period) = period {
            let cutoff = Utc::now() - period;
            points.retain(|p| p.timestamp >= cutoff);
        }
        points.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        points
    }

    async fn check_inactivity(&self) -> InactivityReport {
        let now = Utc::now();
        let raw = match self.store.get(&self.keys.snapshot()).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Inactivity check could not read snapshot: {}", e);
                None
            }
        };

        let Some(raw) = raw else {
            return InactivityReport {
                has_data: false,
                is_first_use: true,
                inactive_hours: 0,
                is_long_inactive: false,
                message: "No portfolio data saved yet".to_string(),
            };
        };

        let Ok(snapshot) = serde_json::from_str::<PnlSnapshot>(&raw) else {
            return InactivityReport {
                has_data: false,
                is_first_use: false,
                inactive_hours: 0,
                is_long_inactive: false,
                message: "Stored snapshot is unreadable".to_string(),
            };
        };

        let inactive_hours = (now - snapshot.saved_at).num_hours().max(0);
        let is_long_inactive = inactive_hours >= LONG_INACTIVITY_HOURS;
        InactivityReport {
            has_data: true,
            is_first_use: false,
            inactive_hours,
            is_long_inactive,
            message: if is_long_inactive {
                format!("Last snapshot is {} hours old", inactive_hours)
            } else {
                format!("Snapshot current as of {} hours ago", inactive_hours)
            },
        }
    }

    async fn clear_all(&self, create_backup: bool) -> ClearOutcome {
        let mut backup_created = false;

        if create_backup {
            let mut archive = serde_json::Map::new();
            archive.insert("clearedAt".to_string(), serde_json::json!(Utc::now()));
            for key in self.keys.clearable() {
                if let Ok(Some(value)) = self.store.get(&key).await {
                    archive.insert(key, serde_json::Value::String(value));
                }
            }

            let serialized = serde_json::Value::Object(archive).to_string();
            match self.store.set(&self.keys.clear_backup(), &serialized).await {
                Ok(()) => backup_created = true,
                Err(e) => {
                    // Refuse to destroy data the caller asked us to archive.
                    error!("Clear-all backup failed, aborting clear: {}", e);
                    return ClearOutcome {
                        cleared_keys: 0,
                        backup_created: false,
                    };
                }
            }
        }

        let mut cleared_keys = 0;
        for key in self.keys.clearable() {
            match self.store.remove(&key).await {
                Ok(true) => cleared_keys += 1,
                Ok(false) => {}
                Err(e) => warn!("Failed to clear '{}': {}", key, e),
            }
        }

        info!("Cleared {} P&L keys (backup: {})", cleared_keys, backup_created);
        ClearOutcome {
            cleared_keys,
            backup_created,
        }
    }

    fn stats(&self) -> SnapshotStoreStats {
        SnapshotStoreStats {
            saves: self.stats.saves.load(Ordering::Relaxed),
            integrity_rejections: self.stats.integrity_rejections.load(Ordering::Relaxed),
            write_failures: self.stats.write_failures.load(Ordering::Relaxed),
            backup_restores: self.stats.backup_restores.load(Ordering::Relaxed),
            corrections: self.stats.corrections.load(Ordering::Relaxed),
        }
    }
}
