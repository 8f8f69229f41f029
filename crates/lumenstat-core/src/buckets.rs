//! Bucket sequences for a period and index-for-index series alignment.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::calendar::Calendar;
use crate::granularity::Granularity;
use crate::period::Period;
use crate::zone::ZoneRules;

/// Lazy iterator over the bucket starts of a period.
///
/// Clones walk the same boundaries independently, so the sequence can be
/// regenerated from the same period at any time.
#[derive(Debug)]
pub struct Buckets<'a, Z> {
    calendar: &'a Calendar<Z>,
    granularity: Granularity,
    next: Option<DateTime<Utc>>,
    end: DateTime<Utc>,
}

impl<Z> Clone for Buckets<'_, Z> {
    fn clone(&self) -> Self {
        Self {
            calendar: self.calendar,
            granularity: self.granularity,
            next: self.next,
            end: self.end,
        }
    }
}

impl<Z: ZoneRules> Iterator for Buckets<'_, Z> {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.filter(|start| *start < self.end)?;
        self.next = self
            .calendar
            .next_boundary(current, self.granularity)
            .filter(|next| *next > current);
        Some(current)
    }
}

/// Materialized bucket starts for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketSequence {
    pub granularity: Granularity,
    pub timezone: String,
    pub starts: Vec<DateTime<Utc>>,
}

impl BucketSequence {
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Zero-fill sparse `(bucket_start, value)` rows onto this sequence.
    /// Rows for instants that are not bucket starts are ignored.
    pub fn fill<T: Clone>(
        &self,
        rows: impl IntoIterator<Item = (DateTime<Utc>, T)>,
        missing: T,
    ) -> Vec<T> {
        let mut by_start: HashMap<DateTime<Utc>, T> = rows.into_iter().collect();
        self.starts
            .iter()
            .map(|start| by_start.remove(start).unwrap_or_else(|| missing.clone()))
            .collect()
    }
}

/// One chart position: the main bucket and, when comparing, the compare
/// bucket drawn at the same index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignedBucket {
    pub index: usize,
    pub bucket: DateTime<Utc>,
    pub compare_bucket: Option<DateTime<Utc>>,
}

/// Pair main and compare buckets by position, regardless of the calendar
/// dates each side represents.
pub fn align(main: &BucketSequence, compare: Option<&BucketSequence>) -> Vec<AlignedBucket> {
    main.starts
        .iter()
        .enumerate()
        .map(|(index, bucket)| AlignedBucket {
            index,
            bucket: *bucket,
            compare_bucket: compare.and_then(|seq| seq.starts.get(index).copied()),
        })
        .collect()
}

impl<Z: ZoneRules> Calendar<Z> {
    pub fn buckets(&self, period: &Period, granularity: Granularity) -> Buckets<'_, Z> {
        Buckets {
            calendar: self,
            granularity,
            next: Some(period.start),
            end: period.end,
        }
    }

    /// Number of buckets in `period`; the count comparisons must preserve.
    pub fn bucket_count(&self, period: &Period, granularity: Granularity) -> usize {
        self.buckets(period, granularity).count()
    }

    pub fn bucket_sequence(&self, period: &Period, granularity: Granularity) -> BucketSequence {
        BucketSequence {
            granularity,
            timezone: period.timezone.clone(),
            starts: self.buckets(period, granularity).collect(),
        }
    }

    /// Local wall-clock labels for each bucket start.
    pub fn labels(&self, sequence: &BucketSequence) -> Vec<String> {
        let pattern = label_pattern(sequence.granularity);
        sequence
            .starts
            .iter()
            .map(|start| self.local(*start).format(pattern).to_string())
            .collect()
    }
}

fn label_pattern(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Minute | Granularity::Hour => "%Y-%m-%d %H:%M",
        Granularity::Day | Granularity::Week => "%Y-%m-%d",
        Granularity::Month => "%Y-%m",
    }
}
