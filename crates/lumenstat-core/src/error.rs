use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::granularity::Granularity;

/// Validation failures raised while resolving a date selection.
///
/// All variants are deterministic: the same inputs (and timezone database
/// version) always produce the same error, so callers never retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("granularity must be one of: minute, hour, day, week, month (got {0:?})")]
    InvalidGranularity(String),

    #[error("start ({start}) must be on or before end ({end})")]
    InvalidPeriod {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("period spans {buckets} {granularity} buckets (allowed {min} to {max})")]
    PeriodOutOfBounds {
        granularity: Granularity,
        buckets: usize,
        min: usize,
        max: usize,
    },

    #[error("{mode} comparison cannot keep {main} buckets (would have {compare})")]
    CompareInfeasible {
        mode: &'static str,
        main: usize,
        compare: usize,
    },

    #[error("custom comparison has {compare} buckets but the main period has {main}")]
    CompareBucketMismatch { main: usize, compare: usize },

    #[error("invalid timezone: {0:?}")]
    InvalidTimezone(String),

    #[error("compare_mode must be one of: none, previous_period, previous_year, custom")]
    InvalidCompareMode(String),

    #[error("compare_start_date and compare_end_date are required for custom compare")]
    MissingCustomRange,

    #[error("invalid {field} (expected YYYY-MM-DD or RFC 3339)")]
    InvalidDate { field: &'static str },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}

impl RangeError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            RangeError::InvalidGranularity(_) => "invalid_granularity",
            RangeError::InvalidPeriod { .. } => "invalid_period",
            RangeError::PeriodOutOfBounds { .. } => "period_out_of_bounds",
            RangeError::CompareInfeasible { .. } => "compare_infeasible",
            RangeError::CompareBucketMismatch { .. } => "compare_bucket_mismatch",
            RangeError::InvalidTimezone(_) => "invalid_timezone",
            RangeError::InvalidCompareMode(_) => "invalid_compare_mode",
            RangeError::MissingCustomRange => "missing_custom_range",
            RangeError::InvalidDate { .. } => "invalid_date",
            RangeError::InvalidFilter(_) => "invalid_filter",
        }
    }

    /// Request field the error refers to, when there is a single one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            RangeError::InvalidGranularity(_) => Some("granularity"),
            RangeError::InvalidTimezone(_) => Some("timezone"),
            RangeError::InvalidCompareMode(_) => Some("compare_mode"),
            RangeError::InvalidDate { field } => Some(*field),
            RangeError::InvalidFilter(_) => Some("filters"),
            RangeError::CompareBucketMismatch { .. } | RangeError::MissingCustomRange => {
                Some("compare_start_date")
            }
            _ => None,
        }
    }
}
