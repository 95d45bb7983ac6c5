//! Refresh cooldown policy for the valuation engine.
//!
//! Scheduled refreshes hit the network at most once per cooldown window so
//! the engine leans on cached prices between passes. A manual refresh always
//! goes through, but triggering one while a cooldown is live extends the
//! next cooldown as a penalty.
//!
//! All transitions take an explicit `now` so tests can drive time directly.

use chrono::{DateTime, Duration, Utc};

use crate::constants::{MANUAL_REFRESH_PENALTY_HOURS, REFRESH_COOLDOWN_HOURS};

/// Cooldown bookkeeping for network-backed valuation passes.
#[derive(Debug, Default, Clone)]
pub struct RefreshPolicy {
    last_refresh: Option<DateTime<Utc>>,
    cooldown_until: Option<DateTime<Utc>>,
}

impl RefreshPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no cooldown is live, so a scheduled refresh may use the network.
    pub fn can_refresh(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.map_or(true, |until| now >= until)
    }

    /// Record a completed scheduled refresh and open a fresh cooldown.
    pub fn note_completed(&mut self, now: DateTime<Utc>) {
        self.last_refresh = Some(now);
        self.cooldown_until = Some(now + Duration::hours(REFRESH_COOLDOWN_HOURS));
    }

    /// Start a manual refresh. Returns true when a cooldown was still live,
    /// which earns the penalty on completion.
    pub fn begin_manual(&self, now: DateTime<Utc>) -> bool {
        !self.can_refresh(now)
    }

    /// Record a completed manual refresh. Breaking into a live cooldown
    /// extends the next one by the penalty.
    pub fn complete_manual(&mut self, now: DateTime<Utc>, broke_cooldown: bool) {
        let mut cooldown = Duration::hours(REFRESH_COOLDOWN_HOURS);
        if broke_cooldown {
            cooldown = cooldown + Duration::hours(MANUAL_REFRESH_PENALTY_HOURS);
        }
        self.last_refresh = Some(now);
        self.cooldown_until = Some(now + cooldown);
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    pub fn cooldown_until(&self) -> Option<DateTime<Utc>> {
        self.cooldown_until
    }

    /// Time left on the live cooldown, if any.
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.cooldown_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_fresh_policy_allows_refresh() {
        let policy = RefreshPolicy::new();
        assert!(policy.can_refresh(base()));
        assert_eq!(policy.last_refresh(), None);
        assert_eq!(policy.cooldown_remaining(base()), None);
    }

    #[test]
    fn test_completed_refresh_opens_cooldown() {
        let mut policy = RefreshPolicy::new();
        let t0 = base();

        policy.note_completed(t0);
        assert_eq!(policy.last_refresh(), Some(t0));
        assert!(!policy.can_refresh(t0 + Duration::hours(7)));
        assert!(!policy.can_refresh(t0 + Duration::hours(8) - Duration::seconds(1)));
        assert!(policy.can_refresh(t0 + Duration::hours(8)));
    }

    #[test]
    fn test_manual_refresh_when_idle_has_no_penalty() {
        let mut policy = RefreshPolicy::new();
        let t0 = base();

        let broke_cooldown = policy.begin_manual(t0);
        assert!(!broke_cooldown);

        policy.complete_manual(t0, broke_cooldown);
        assert_eq!(policy.cooldown_until(), Some(t0 + Duration::hours(8)));
    }

    #[test]
    fn test_manual_refresh_during_cooldown_earns_penalty() {
        let mut policy = RefreshPolicy::new();
        let t0 = base();

        policy.note_completed(t0);

        // Two hours in the cooldown is still live
        let t1 = t0 + Duration::hours(2);
        let broke_cooldown = policy.begin_manual(t1);
        assert!(broke_cooldown);

        policy.complete_manual(t1, broke_cooldown);
        assert_eq!(policy.last_refresh(), Some(t1));
        assert_eq!(policy.cooldown_until(), Some(t1 + Duration::hours(10)));
        assert!(!policy.can_refresh(t1 + Duration::hours(9)));
        assert!(policy.can_refresh(t1 + Duration::hours(10)));
    }

    #[test]
    fn test_manual_refresh_after_cooldown_expires_is_clean() {
        let mut policy = RefreshPolicy::new();
        let t0 = base();

        policy.note_completed(t0);

        let t1 = t0 + Duration::hours(9);
        let broke_cooldown = policy.begin_manual(t1);
        assert!(!broke_cooldown);

        policy.complete_manual(t1, broke_cooldown);
        assert_eq!(policy.cooldown_until(), Some(t1 + Duration::hours(8)));
    }

    #[test]
    fn test_cooldown_remaining_counts_down() {
        let mut policy = RefreshPolicy::new();
        let t0 = base();

        policy.note_completed(t0);
        assert_eq!(
            policy.cooldown_remaining(t0 + Duration::hours(3)),
            Some(Duration::hours(5))
        );
        assert_eq!(policy.cooldown_remaining(t0 + Duration::hours(8)), None);
    }
}
