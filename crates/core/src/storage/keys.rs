//! Per-user storage key composition.

use crate::constants::{
    PL_CLEAR_BACKUP_KEY, PL_CONSISTENCY_KEY, PL_SNAPSHOT_BACKUP_KEY, PL_SNAPSHOT_KEY,
    PL_TIME_SERIES_KEY, TRANSACTIONS_KEY, TRANSACTION_COUNTER_KEY,
};

/// Composes the user-scoped storage keys for one portfolio.
///
/// Ledger and P&L records are namespaced by a user identity so several
/// portfolios can share one store; the market price cache is deliberately
/// global and not composed here.
#[derive(Clone, Debug)]
pub struct UserKeys {
    namespace: String,
}

impl UserKeys {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn scoped(&self, base: &str) -> String {
        format!("{}_{}", base, self.namespace)
    }

    pub fn transactions(&self) -> String {
        self.scoped(TRANSACTIONS_KEY)
    }

    pub fn transaction_counter(&self) -> String {
        self.scoped(TRANSACTION_COUNTER_KEY)
    }

    pub fn snapshot(&self) -> String {
        self.scoped(PL_SNAPSHOT_KEY)
    }

    pub fn snapshot_backup(&self) -> String {
        self.scoped(PL_SNAPSHOT_BACKUP_KEY)
    }

    pub fn time_series(&self) -> String {
        self.scoped(PL_TIME_SERIES_KEY)
    }

    pub fn consistency_check(&self) -> String {
        self.scoped(PL_CONSISTENCY_KEY)
    }

    pub fn clear_backup(&self) -> String {
        self.scoped(PL_CLEAR_BACKUP_KEY)
    }

    /// All P&L keys subject to clear-all, excluding the safety backup.
    pub fn clearable(&self) -> Vec<String> {
        vec![
            self.snapshot(),
            self.snapshot_backup(),
            self.time_series(),
            self.consistency_check(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_carry_namespace_suffix() {
        let keys = UserKeys::new("user1");
        assert_eq!(keys.transactions(), "local_transactions_user1");
        assert_eq!(keys.snapshot(), "pl_snapshot_data_v2_user1");
        assert_eq!(keys.snapshot_backup(), "pl_snapshot_backup_v2_user1");
        assert_eq!(keys.time_series(), "pl_time_series_v2_user1");
    }

    #[test]
    fn test_distinct_users_do_not_collide() {
        let a = UserKeys::new("alice");
        let b = UserKeys::new("bob");
        assert_ne!(a.snapshot(), b.snapshot());
        assert_ne!(a.transactions(), b.transactions());
    }

    #[test]
    fn test_clearable_excludes_clear_backup() {
        let keys = UserKeys::new("user1");
        let clearable = keys.clearable();
        assert_eq!(clearable.len(), 4);
        assert!(!clearable.contains(&keys.clear_backup()));
    }
}
