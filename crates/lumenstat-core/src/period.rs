//! Period normalization: snap a raw selection to whole buckets.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::Calendar;
use crate::error::RangeError;
use crate::granularity::Granularity;
use crate::zone::ZoneRules;

/// A half-open window `[start, end)` in a named timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone: String,
}

impl Period {
    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

impl<Z: ZoneRules> Calendar<Z> {
    /// Align `[raw_start, raw_end]` outward to bucket boundaries.
    ///
    /// The start floors and the end ceils, so the returned period covers
    /// every bucket the raw selection touches. Normalizing an already
    /// aligned period returns it unchanged.
    pub fn normalize(
        &self,
        raw_start: DateTime<Utc>,
        raw_end: DateTime<Utc>,
        granularity: Granularity,
    ) -> Result<Period, RangeError> {
        if raw_start > raw_end {
            return Err(RangeError::InvalidPeriod {
                start: raw_start,
                end: raw_end,
            });
        }

        let start = self.floor(raw_start, granularity);
        let end = self.ceil(raw_end, granularity);
        if start > end {
            return Err(RangeError::InvalidPeriod { start, end });
        }

        let bounds = granularity.bounds();
        // Every bucket is at most `longest_bucket` long, so this many buckets
        // is a lower bound on the real count. Reject before enumerating.
        let min_possible = lower_bound_buckets(end - start, granularity);
        if min_possible > bounds.max_buckets {
            return Err(RangeError::PeriodOutOfBounds {
                granularity,
                buckets: min_possible,
                min: bounds.min_buckets,
                max: bounds.max_buckets,
            });
        }

        let period = Period {
            start,
            end,
            timezone: self.timezone().to_string(),
        };
        let buckets = self.bucket_count(&period, granularity);
        if !bounds.contains(buckets) {
            return Err(RangeError::PeriodOutOfBounds {
                granularity,
                buckets,
                min: bounds.min_buckets,
                max: bounds.max_buckets,
            });
        }

        Ok(period)
    }
}

fn lower_bound_buckets(span: Duration, granularity: Granularity) -> usize {
    let longest = granularity.longest_bucket().num_seconds();
    let seconds = span.num_seconds().max(0);
    usize::try_from(seconds / longest).unwrap_or(usize::MAX)
}
