//! Resolution of `"auto"` sampling periods.

use chrono::{DateTime, Duration, Utc};

use crate::time_range::TimeRange;

/// Upper bound on datapoints a single series is sized for.
const TARGET_DATAPOINTS: i64 = 2000;

/// Picks a sampling period (seconds) for queries that ask for `"auto"`.
pub trait PeriodResolver: Send + Sync {
    fn resolve(&self, range: &TimeRange) -> u32;
}

/// Always answers with the same period.
#[derive(Debug, Clone, Copy)]
pub struct FixedPeriodResolver(pub u32);

impl PeriodResolver for FixedPeriodResolver {
    fn resolve(&self, _range: &TimeRange) -> u32 {
        self.0
    }
}

/// Chooses among the periods the backend still retains for the range's age.
///
/// High-resolution periods age out of the backend: one-minute data is kept
/// for 15 days, five-minute data for 63 days, hourly data for 455 days.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionPeriodResolver;

impl RetentionPeriodResolver {
    pub fn resolve_at(&self, range: &TimeRange, now: DateTime<Utc>) -> u32 {
        let candidates = retained_periods(now - range.from);
        let width = range.width_seconds().max(0);
        let needed = (width + TARGET_DATAPOINTS - 1) / TARGET_DATAPOINTS;

        candidates
            .iter()
            .copied()
            .find(|p| i64::from(*p) >= needed)
            .unwrap_or(candidates[candidates.len() - 1])
    }
}

impl PeriodResolver for RetentionPeriodResolver {
    fn resolve(&self, range: &TimeRange) -> u32 {
        self.resolve_at(range, Utc::now())
    }
}

fn retained_periods(age: Duration) -> &'static [u32] {
    if age > Duration::days(455) {
        &[21600, 86400]
    } else if age > Duration::days(63) {
        &[3600, 21600, 86400]
    } else if age > Duration::days(15) {
        &[300, 900, 3600, 21600, 86400]
    } else {
        &[60, 300, 900, 3600, 21600, 86400]
    }
}
