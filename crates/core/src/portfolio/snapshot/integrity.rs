//! Snapshot integrity hashing, validation, and repair.
//!
//! Every load path funnels through the same validate-then-repair pair, so
//! a snapshot that reaches a caller always satisfies
//! `profit_loss == total_value - total_invested` within tolerance.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::constants::{
    PL_TOLERANCE, SNAPSHOT_FORMAT_VERSION, SNAPSHOT_FUTURE_TOLERANCE_HOURS, SNAPSHOT_MAX_AGE_DAYS,
};
use crate::portfolio::snapshot::PnlSnapshot;

/// Computes the integrity hash over the snapshot's core triple.
///
/// The hash is a SHA-256 over the normalized decimal strings joined with
/// `|`, plus the format version. Normalization strips trailing zeros so
/// `100.00` and `100` hash identically.
pub fn compute_integrity_hash(
    total_value: Decimal,
    total_invested: Decimal,
    profit_loss: Decimal,
    format_version: u32,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_decimal(total_value).as_bytes());
    hasher.update(b"|");
    hasher.update(normalize_decimal(total_invested).as_bytes());
    hasher.update(b"|");
    hasher.update(normalize_decimal(profit_loss).as_bytes());
    hasher.update(b"|");
    hasher.update(format_version.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Normalize decimal to a consistent string format for hashing.
fn normalize_decimal(d: Decimal) -> String {
    d.normalize().to_string()
}

/// A reason a stored snapshot cannot be trusted at all.
///
/// These are hard failures: the record is discarded (or the backup tried),
/// unlike P&L drift which is repairable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    NegativeValue,
    NegativeInvested,
    MissingWriteId,
    MissingHash,
    TimestampTooOld,
    TimestampInFuture,
}

impl std::fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            IntegrityIssue::NegativeValue => "total value is negative",
            IntegrityIssue::NegativeInvested => "total invested is negative",
            IntegrityIssue::MissingWriteId => "write id is missing",
            IntegrityIssue::MissingHash => "integrity hash is missing",
            IntegrityIssue::TimestampTooOld => "saved timestamp is older than the retention window",
            IntegrityIssue::TimestampInFuture => "saved timestamp is in the future",
        };
        write!(f, "{}", text)
    }
}

/// Validates a loaded snapshot's structural integrity.
///
/// Required fields are enforced by deserialization before this runs; what
/// remains is the numeric sign gate and the timestamp window
/// `[now - 365d, now + 1h]`.
pub fn validate(snapshot: &PnlSnapshot, now: DateTime<Utc>) -> Result<(), IntegrityIssue> {
    if snapshot.total_value < Decimal::ZERO {
        return Err(IntegrityIssue::NegativeValue);
    }
    if snapshot.total_invested < Decimal::ZERO {
        return Err(IntegrityIssue::NegativeInvested);
    }
    if snapshot.write_id.trim().is_empty() {
        return Err(IntegrityIssue::MissingWriteId);
    }
    if snapshot.integrity_hash.trim().is_empty() {
        return Err(IntegrityIssue::MissingHash);
    }
    if snapshot.saved_at < now - Duration::days(SNAPSHOT_MAX_AGE_DAYS) {
        return Err(IntegrityIssue::TimestampTooOld);
    }
    if snapshot.saved_at > now + Duration::hours(SNAPSHOT_FUTURE_TOLERANCE_HOURS) {
        return Err(IntegrityIssue::TimestampInFuture);
    }
    Ok(())
}

/// Checks the snapshot against the definitional P&L formula and the stored
/// hash, producing a corrected copy when either disagrees.
///
/// `None` means the snapshot is already consistent. A `Some` carries the
/// repaired record with `profit_loss`, `percentage_change`, and
/// `integrity_hash` rewritten; the caller persists it and logs the event.
pub fn repair(snapshot: &PnlSnapshot) -> Option<PnlSnapshot> {
    let expected_profit_loss = snapshot.total_value - snapshot.total_invested;
    let drift = (snapshot.profit_loss - expected_profit_loss).abs();
    let hash_matches = snapshot.integrity_hash
        == compute_integrity_hash(
            snapshot.total_value,
            snapshot.total_invested,
            snapshot.profit_loss,
            SNAPSHOT_FORMAT_VERSION,
        );

    if hash_matches && drift <= PL_TOLERANCE {
        return None;
    }

    let mut corrected = snapshot.clone();
    corrected.profit_loss = expected_profit_loss;
    corrected.percentage_change = percentage_change(expected_profit_loss, snapshot.total_invested);
    corrected.integrity_hash = compute_integrity_hash(
        snapshot.total_value,
        snapshot.total_invested,
        expected_profit_loss,
        SNAPSHOT_FORMAT_VERSION,
    );
    Some(corrected)
}

/// Percent gain over the invested total, zero when nothing is invested.
pub fn percentage_change(profit_loss: Decimal, total_invested: Decimal) -> Decimal {
    if total_invested.is_zero() {
        Decimal::ZERO
    } else {
        profit_loss / total_invested.abs() * Decimal::ONE_HUNDRED
    }
}
