use chrono::{DateTime, Duration, Utc};

pub const FRESHNESS_WINDOW_DAYS: i64 = 30;

/// Decides whether a stored profile may be reused as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    window: Duration,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            window: Duration::days(FRESHNESS_WINDOW_DAYS),
        }
    }
}

impl FreshnessPolicy {
    /// Fresh when at most `window` has elapsed since the last interaction (inclusive).
    /// A timestamp in the future counts as fresh.
    pub fn is_fresh(&self, last_interaction: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(last_interaction) <= self.window
    }
}
