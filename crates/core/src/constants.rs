use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Storage key for the transaction ledger
pub const TRANSACTIONS_KEY: &str = "local_transactions";

/// Storage key for the persisted transaction id counter
pub const TRANSACTION_COUNTER_KEY: &str = "transaction_id_counter";

/// Storage key for the primary P&L snapshot
pub const PL_SNAPSHOT_KEY: &str = "pl_snapshot_data_v2";

/// Storage key for the P&L snapshot backup
pub const PL_SNAPSHOT_BACKUP_KEY: &str = "pl_snapshot_backup_v2";

/// Storage key for the P&L time series
pub const PL_TIME_SERIES_KEY: &str = "pl_time_series_v2";

/// Storage key for the cached consistency check result
pub const PL_CONSISTENCY_KEY: &str = "pl_consistency_check_v1";

/// Storage key for the safety backup taken by clear-all
pub const PL_CLEAR_BACKUP_KEY: &str = "pl_clear_backup_v1";

/// Storage key for the persisted market price cache (global, not per user)
pub const PRICE_CACHE_KEY: &str = "crypto_prices_cache_v4";

/// Version stamped into snapshot integrity hashes
pub const SNAPSHOT_FORMAT_VERSION: u32 = 2;

/// Tolerance for profit/loss consistency comparisons
pub const PL_TOLERANCE: Decimal = dec!(0.01);

/// Oldest acceptable snapshot age, in days
pub const SNAPSHOT_MAX_AGE_DAYS: i64 = 365;

/// Allowed clock skew into the future for snapshot timestamps, in hours
pub const SNAPSHOT_FUTURE_TOLERANCE_HOURS: i64 = 1;

/// Time series retention window, in days
pub const TIME_SERIES_WINDOW_DAYS: i64 = 90;

/// Minimum number of time series points kept regardless of age
pub const TIME_SERIES_MIN_POINTS: usize = 10;

/// Cooldown between network refreshes, in hours
pub const REFRESH_COOLDOWN_HOURS: i64 = 8;

/// Extra cooldown after a manual refresh override, in hours
pub const MANUAL_REFRESH_PENALTY_HOURS: i64 = 2;

/// Inactivity threshold considered "long", in hours
pub const LONG_INACTIVITY_HOURS: i64 = 24;

/// Exchange recorded when the caller does not provide one
pub const DEFAULT_EXCHANGE: &str = "Unknown";
