//! Comparison periods: derive a second window with the same bucket count
//! as the main period so both series chart point-for-point.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::{shift_months, Calendar};
use crate::error::RangeError;
use crate::granularity::Granularity;
use crate::period::Period;
use crate::zone::ZoneRules;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CompareMode {
    #[default]
    Off,
    PreviousPeriod,
    PreviousYear,
    Custom {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl CompareMode {
    /// Parse the `compare_mode` request value. `custom` needs both bounds.
    pub fn parse(
        raw: Option<&str>,
        custom_start: Option<DateTime<Utc>>,
        custom_end: Option<DateTime<Utc>>,
    ) -> Result<Self, RangeError> {
        match raw.map(str::trim) {
            None | Some("") | Some("none") | Some("off") => Ok(Self::Off),
            Some("previous_period") => Ok(Self::PreviousPeriod),
            Some("previous_year") => Ok(Self::PreviousYear),
            Some("custom") => match (custom_start, custom_end) {
                (Some(start), Some(end)) => Ok(Self::Custom { start, end }),
                _ => Err(RangeError::MissingCustomRange),
            },
            Some(other) => Err(RangeError::InvalidCompareMode(other.to_string())),
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            CompareMode::Off => "none",
            CompareMode::PreviousPeriod => "previous_period",
            CompareMode::PreviousYear => "previous_year",
            CompareMode::Custom { .. } => "custom",
        }
    }

    pub fn is_off(&self) -> bool {
        matches!(self, CompareMode::Off)
    }
}

/// Human-readable ranges echoed back to the dashboard next to a compare
/// series. Both ranges are inclusive and in the request timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonMetadata {
    pub mode: &'static str,
    pub primary_range: [String; 2],
    pub comparison_range: [String; 2],
}

impl<Z: ZoneRules> Calendar<Z> {
    /// Resolve the comparison window for an aligned `main` period.
    ///
    /// Returns `Ok(None)` when comparison is off. Any returned period has
    /// exactly as many buckets as `main`.
    pub fn resolve_comparison(
        &self,
        main: &Period,
        granularity: Granularity,
        mode: &CompareMode,
    ) -> Result<Option<Period>, RangeError> {
        let main_buckets = self.bucket_count(main, granularity);
        let infeasible = |compare: usize| RangeError::CompareInfeasible {
            mode: mode.slug(),
            main: main_buckets,
            compare,
        };

        let compare = match mode {
            CompareMode::Off => return Ok(None),
            CompareMode::PreviousPeriod => {
                // Step whole buckets so months of different lengths and DST
                // days keep the count; wall-clock duration may differ.
                let steps = i64::try_from(main_buckets).map_err(|_| infeasible(0))?;
                let start = self
                    .step(main.start, granularity, -steps)
                    .ok_or_else(|| infeasible(0))?;
                Period {
                    start,
                    end: main.start,
                    timezone: main.timezone.clone(),
                }
            }
            CompareMode::PreviousYear => {
                let last = self
                    .previous_boundary(main.end, granularity)
                    .ok_or_else(|| infeasible(0))?;
                let start = self.year_earlier(main.start).ok_or_else(|| infeasible(0))?;
                let last = self.year_earlier(last).ok_or_else(|| infeasible(0))?;
                let end = self
                    .next_boundary(self.floor(last, granularity), granularity)
                    .ok_or_else(|| infeasible(0))?;
                self.normalize(start, end, granularity)?
            }
            CompareMode::Custom { start, end } => self.normalize(*start, *end, granularity)?,
        };

        let compare_buckets = self.bucket_count(&compare, granularity);
        if compare_buckets != main_buckets {
            return Err(match mode {
                CompareMode::Custom { .. } => RangeError::CompareBucketMismatch {
                    main: main_buckets,
                    compare: compare_buckets,
                },
                _ => infeasible(compare_buckets),
            });
        }

        Ok(Some(compare))
    }

    pub fn comparison_metadata(
        &self,
        mode: &CompareMode,
        main: &Period,
        compare: &Period,
        granularity: Granularity,
    ) -> ComparisonMetadata {
        ComparisonMetadata {
            mode: mode.slug(),
            primary_range: self.inclusive_range(main, granularity),
            comparison_range: self.inclusive_range(compare, granularity),
        }
    }

    /// First and last covered moment of `period` as local labels: dates for
    /// calendar granularities, bucket starts for minute/hour.
    pub fn inclusive_range(&self, period: &Period, granularity: Granularity) -> [String; 2] {
        if granularity.is_calendar() {
            let last = period.end - Duration::seconds(1);
            return [
                self.local(period.start).date().to_string(),
                self.local(last.max(period.start)).date().to_string(),
            ];
        }
        let last = self
            .previous_boundary(period.end, granularity)
            .filter(|last| *last >= period.start)
            .unwrap_or(period.start);
        [
            self.local(period.start).format("%Y-%m-%d %H:%M").to_string(),
            self.local(last).format("%Y-%m-%d %H:%M").to_string(),
        ]
    }

    fn year_earlier(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = shift_months(self.local(instant), -12)?;
        Some(self.instant(local))
    }
}
