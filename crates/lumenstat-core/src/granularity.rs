//! Granularity catalog: the bucket sizes a period can be aggregated at.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::RangeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

/// Allowed size of a selected period, measured in buckets.
///
/// Counting buckets instead of wall-clock time keeps a 23-hour DST day or
/// a 28-day February valid as "one bucket".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpanBounds {
    pub min_buckets: usize,
    pub max_buckets: usize,
}

impl SpanBounds {
    pub fn contains(&self, buckets: usize) -> bool {
        (self.min_buckets..=self.max_buckets).contains(&buckets)
    }
}

impl Granularity {
    pub const ALL: [Granularity; 5] = [
        Granularity::Minute,
        Granularity::Hour,
        Granularity::Day,
        Granularity::Week,
        Granularity::Month,
    ];

    pub fn parse(raw: &str) -> Result<Self, RangeError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "minute" => Ok(Self::Minute),
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            _ => Err(RangeError::InvalidGranularity(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Minute => "minute",
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }

    /// i18n key for the dashboard's granularity picker.
    pub fn label_key(&self) -> &'static str {
        match self {
            Granularity::Minute => "granularity.minute",
            Granularity::Hour => "granularity.hour",
            Granularity::Day => "granularity.day",
            Granularity::Week => "granularity.week",
            Granularity::Month => "granularity.month",
        }
    }

    pub fn bounds(&self) -> SpanBounds {
        let max_buckets = match self {
            Granularity::Minute => 2 * 24 * 60,
            Granularity::Hour => 92 * 24,
            Granularity::Day => 1_100,
            Granularity::Week => 260,
            Granularity::Month => 120,
        };
        SpanBounds {
            min_buckets: 1,
            max_buckets,
        }
    }

    /// Bucket length for granularities that are plain arithmetic on the
    /// instant. Calendar granularities return `None`.
    pub fn fixed_duration(&self) -> Option<Duration> {
        match self {
            Granularity::Minute => Some(Duration::minutes(1)),
            Granularity::Hour => Some(Duration::hours(1)),
            Granularity::Day | Granularity::Week | Granularity::Month => None,
        }
    }

    pub fn is_calendar(&self) -> bool {
        self.fixed_duration().is_none()
    }

    /// Upper bound on the wall-clock length of any single bucket, including
    /// DST fall-back days. Used to reject oversized spans before enumerating
    /// buckets.
    pub(crate) fn longest_bucket(&self) -> Duration {
        match self {
            Granularity::Minute => Duration::minutes(2),
            Granularity::Hour => Duration::hours(2),
            Granularity::Day => Duration::hours(26),
            Granularity::Week => Duration::hours(7 * 24 + 2),
            Granularity::Month => Duration::hours(31 * 24 + 2),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Granularity::parse(s)
    }
}

/// Auto-granularity for an inclusive date selection: ≤2 days → hour,
/// 3–60 → day, >60 → month.
pub fn auto_granularity(start: NaiveDate, end: NaiveDate) -> Granularity {
    let days = (end - start).num_days() + 1;
    if days <= 2 {
        Granularity::Hour
    } else if days <= 60 {
        Granularity::Day
    } else {
        Granularity::Month
    }
}
