//! Query time windows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Half-open interval `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Reject empty and inverted windows.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.from >= self.to {
            return Err(QueryError::InvalidTimeRange);
        }
        Ok(())
    }

    pub fn width_seconds(&self) -> i64 {
        (self.to - self.from).num_seconds()
    }
}
