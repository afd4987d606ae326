use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::parse_timestamp;

/// Step decay on time since last activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecencyConfig {
    pub fresh_days: i64,
    pub fresh_score: f64,
    pub stale_days: i64,
    pub stale_score: f64,
}

impl Default for RecencyConfig {
    fn default() -> Self {
        Self {
            fresh_days: 90,
            fresh_score: 1.0,
            stale_days: 180,
            stale_score: 0.5,
        }
    }
}

/// Scores an already-parsed activity instant against `now`.
///
/// Both bounds are inclusive. Activity dated after `now` counts as fresh.
pub fn recency_from_instant(
    last_active: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    config: &RecencyConfig,
) -> f64 {
    let Some(last_active) = last_active else {
        return 0.0;
    };

    let elapsed = now - last_active;
    if elapsed <= Duration::days(config.fresh_days) {
        config.fresh_score
    } else if elapsed <= Duration::days(config.stale_days) {
        config.stale_score
    } else {
        0.0
    }
}

/// Parses the raw `last_active` cell and applies the step decay.
/// Missing or unparsable timestamps score 0.
pub fn recency_score(last_active: &str, now: DateTime<Utc>, config: &RecencyConfig) -> f64 {
    recency_from_instant(parse_timestamp(last_active), now, config)
}
