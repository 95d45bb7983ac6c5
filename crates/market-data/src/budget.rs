//! Rolling call budget for the upstream price API.
//!
//! Free-tier crypto APIs tolerate very few calls, so instead of a per-minute
//! token bucket the budget spreads a handful of calls over a long rolling
//! window and enforces a minimum spacing between consecutive calls. An
//! upstream HTTP 429 fast-forwards the counter to the cap, marking the rest
//! of the window as off-limits.
//!
//! All transitions take an explicit `now` so tests can drive time directly.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

/// Default cap of calls per rolling window.
const DEFAULT_MAX_CALLS_PER_WINDOW: u32 = 5;

/// Default rolling window length, in hours.
const DEFAULT_WINDOW_HOURS: i64 = 8;

/// Default minimum spacing between consecutive calls, in minutes.
const DEFAULT_MIN_SPACING_MINUTES: i64 = 5;

/// Call budget configuration.
#[derive(Clone, Debug)]
pub struct CallBudgetConfig {
    /// Maximum number of calls inside one rolling window.
    pub max_calls_per_window: u32,
    /// Length of the rolling window.
    pub window: Duration,
    /// Minimum spacing between two consecutive calls.
    pub min_spacing: Duration,
}

impl Default for CallBudgetConfig {
    fn default() -> Self {
        Self {
            max_calls_per_window: DEFAULT_MAX_CALLS_PER_WINDOW,
            window: Duration::hours(DEFAULT_WINDOW_HOURS),
            min_spacing: Duration::minutes(DEFAULT_MIN_SPACING_MINUTES),
        }
    }
}

/// Mutable budget state. The window opens on the first call and closes
/// `config.window` later; an expired window resets lazily on the next check.
#[derive(Debug, Default)]
struct BudgetState {
    window_started: Option<DateTime<Utc>>,
    calls_in_window: u32,
    last_call: Option<DateTime<Utc>>,
}

/// Snapshot of the budget for diagnostics and error reporting.
#[derive(Clone, Debug)]
pub struct BudgetStatus {
    pub calls_in_window: u32,
    pub max_calls_per_window: u32,
    /// True when the cap is reached for the live window.
    pub is_exhausted: bool,
    /// Earliest instant a call would be permitted.
    pub next_call_at: DateTime<Utc>,
    /// When the live window expires, if one is open.
    pub window_resets_at: Option<DateTime<Utc>>,
}

/// Thread-safe rolling call budget.
pub struct CallBudget {
    config: CallBudgetConfig,
    state: Mutex<BudgetState>,
}

impl CallBudget {
    pub fn new(config: CallBudgetConfig) -> Self {
        Self {
            config,
            state: Mutex::new(BudgetState::default()),
        }
    }

    /// Lock the state mutex, recovering from poison if necessary.
    ///
    /// Worst case after recovery is one extra or one missed call in the
    /// window, which is acceptable for budgeting.
    fn lock_state(&self) -> MutexGuard<'_, BudgetState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Call budget mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Reset the window if it has fully elapsed.
    fn roll(&self, state: &mut BudgetState, now: DateTime<Utc>) {
        if let Some(started) = state.window_started {
            if now - started >= self.config.window {
                debug!(
                    "Call budget window expired ({} calls used), opening fresh window",
                    state.calls_in_window
                );
                state.window_started = None;
                state.calls_in_window = 0;
            }
        }
    }

    /// Try to consume one call from the budget.
    ///
    /// Returns false when the window cap is reached or the previous call was
    /// too recent. A successful acquire opens a window if none is live.
    pub fn try_acquire(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.lock_state();
        self.roll(&mut state, now);

        if state.calls_in_window >= self.config.max_calls_per_window {
            debug!("Call budget denied: window cap reached");
            return false;
        }

        if let Some(last) = state.last_call {
            if now - last < self.config.min_spacing {
                debug!("Call budget denied: minimum spacing not elapsed");
                return false;
            }
        }

        if state.window_started.is_none() {
            state.window_started = Some(now);
        }
        state.calls_in_window += 1;
        state.last_call = Some(now);
        debug!(
            "Call budget acquired ({}/{} in window)",
            state.calls_in_window, self.config.max_calls_per_window
        );
        true
    }

    /// Record an upstream 429: the remainder of the window is off-limits.
    pub fn note_rate_limited(&self, now: DateTime<Utc>) {
        let mut state = self.lock_state();
        self.roll(&mut state, now);

        if state.window_started.is_none() {
            state.window_started = Some(now);
        }
        state.calls_in_window = self.config.max_calls_per_window;
        state.last_call = Some(now);
        warn!(
            "Provider rate limited the request, budget exhausted until {}",
            state.window_started.unwrap_or(now) + self.config.window
        );
    }

    /// True when the cap is reached for the live window.
    pub fn is_exhausted(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.lock_state();
        self.roll(&mut state, now);
        state.calls_in_window >= self.config.max_calls_per_window
    }

    /// Snapshot of counters and timings for diagnostics.
    pub fn status(&self, now: DateTime<Utc>) -> BudgetStatus {
        let mut state = self.lock_state();
        self.roll(&mut state, now);

        let window_resets_at = state.window_started.map(|t| t + self.config.window);
        let is_exhausted = state.calls_in_window >= self.config.max_calls_per_window;

        let mut next_call_at = now;
        if let Some(last) = state.last_call {
            let spaced = last + self.config.min_spacing;
            if spaced > next_call_at {
                next_call_at = spaced;
            }
        }
        if is_exhausted {
            if let Some(reset) = window_resets_at {
                if reset > next_call_at {
                    next_call_at = reset;
                }
            }
        }

        BudgetStatus {
            calls_in_window: state.calls_in_window,
            max_calls_per_window: self.config.max_calls_per_window,
            is_exhausted,
            next_call_at,
            window_resets_at,
        }
    }
}

impl Default for CallBudget {
    fn default() -> Self {
        Self::new(CallBudgetConfig::default())
    }
}
