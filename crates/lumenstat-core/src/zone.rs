//! Timezone rules used for bucket flooring.
//!
//! The calendar never talks to the timezone database directly; it asks a
//! [`ZoneRules`] implementation for offsets. Production code uses
//! [`chrono_tz::Tz`]; tests can inject a [`FixedRuleZone`] to pin DST
//! transitions regardless of the bundled database version.

use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::RangeError;

pub trait ZoneRules {
    /// IANA identifier carried into outbound queries.
    fn id(&self) -> &str;

    /// Offset in effect at `instant`.
    fn offset_at(&self, instant: DateTime<Utc>) -> FixedOffset;

    /// Offsets under which the wall-clock time `local` exists. `None` inside
    /// a forward (spring) gap, `Ambiguous` inside a backward (fall) overlap.
    fn offsets_for_local(&self, local: NaiveDateTime) -> LocalResult<FixedOffset>;
}

impl ZoneRules for Tz {
    fn id(&self) -> &str {
        Tz::name(*self)
    }

    fn offset_at(&self, instant: DateTime<Utc>) -> FixedOffset {
        self.offset_from_utc_datetime(&instant.naive_utc()).fix()
    }

    fn offsets_for_local(&self, local: NaiveDateTime) -> LocalResult<FixedOffset> {
        self.offset_from_local_datetime(&local).map(|offset| offset.fix())
    }
}

/// A zone with one standard offset and an optional daylight window, for
/// deterministic tests of DST edges.
#[derive(Debug, Clone)]
pub struct FixedRuleZone {
    id: String,
    standard: FixedOffset,
    daylight: Option<(FixedOffset, DateTime<Utc>, DateTime<Utc>)>,
}

impl FixedRuleZone {
    pub fn new(id: impl Into<String>, standard: FixedOffset) -> Self {
        Self {
            id: id.into(),
            standard,
            daylight: None,
        }
    }

    /// Apply `offset` for instants in `[from, until)`.
    pub fn with_daylight(
        mut self,
        offset: FixedOffset,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Self {
        self.daylight = Some((offset, from, until));
        self
    }
}

impl ZoneRules for FixedRuleZone {
    fn id(&self) -> &str {
        &self.id
    }

    fn offset_at(&self, instant: DateTime<Utc>) -> FixedOffset {
        match self.daylight {
            Some((offset, from, until)) if from <= instant && instant < until => offset,
            _ => self.standard,
        }
    }

    fn offsets_for_local(&self, local: NaiveDateTime) -> LocalResult<FixedOffset> {
        let mut candidates = vec![self.standard];
        if let Some((offset, _, _)) = self.daylight {
            candidates.push(offset);
        }
        let mut valid: Vec<FixedOffset> = candidates
            .into_iter()
            .filter(|offset| self.offset_at(instant_for(local, *offset)) == *offset)
            .collect();
        // Earliest instant first, matching chrono's ordering.
        valid.sort_by_key(|offset| std::cmp::Reverse(offset.local_minus_utc()));
        valid.dedup();
        match valid.as_slice() {
            [] => LocalResult::None,
            [single] => LocalResult::Single(*single),
            [first, second, ..] => LocalResult::Ambiguous(*first, *second),
        }
    }
}

/// Parse an IANA timezone identifier.
pub fn parse_timezone(raw: &str) -> Result<Tz, RangeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RangeError::InvalidTimezone(raw.to_string()));
    }
    trimmed
        .parse::<Tz>()
        .map_err(|_| RangeError::InvalidTimezone(raw.to_string()))
}

/// Wall-clock time of `instant` in `zone`.
pub fn to_local<Z: ZoneRules + ?Sized>(zone: &Z, instant: DateTime<Utc>) -> NaiveDateTime {
    let offset = zone.offset_at(instant);
    instant.naive_utc() + Duration::seconds(i64::from(offset.local_minus_utc()))
}

/// Instant at which the wall clock in `zone` first reads `local`.
///
/// Ambiguous times (fall-back overlap) resolve to the earlier instant.
/// Times skipped by a spring-forward gap resolve through the offset in
/// effect before the gap, which lands on the first instant after it.
pub fn from_local<Z: ZoneRules + ?Sized>(zone: &Z, local: NaiveDateTime) -> DateTime<Utc> {
    let offset = match zone.offsets_for_local(local) {
        LocalResult::Single(offset) => offset,
        LocalResult::Ambiguous(a, b) => {
            if a.local_minus_utc() >= b.local_minus_utc() {
                a
            } else {
                b
            }
        }
        LocalResult::None => {
            let before_gap = Utc.from_utc_datetime(&(local - Duration::days(1)));
            zone.offset_at(before_gap)
        }
    };
    instant_for(local, offset)
}

fn instant_for(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    Utc.from_utc_datetime(&(local - Duration::seconds(i64::from(offset.local_minus_utc()))))
}
