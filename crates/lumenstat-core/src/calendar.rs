//! Bucket boundaries in a timezone.

use chrono::{
    DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday,
};

use crate::granularity::Granularity;
use crate::zone::{from_local, to_local, ZoneRules};

/// Timezone rules plus the calendar conventions used to cut them into
/// buckets. Cheap to build per request; holds no mutable state.
#[derive(Debug, Clone)]
pub struct Calendar<Z> {
    zone: Z,
    week_start: Weekday,
}

impl<Z: ZoneRules> Calendar<Z> {
    /// Calendar with ISO weeks (Monday first).
    pub fn new(zone: Z) -> Self {
        Self {
            zone,
            week_start: Weekday::Mon,
        }
    }

    pub fn with_week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = week_start;
        self
    }

    pub fn zone(&self) -> &Z {
        &self.zone
    }

    pub fn timezone(&self) -> &str {
        self.zone.id()
    }

    pub fn week_start(&self) -> Weekday {
        self.week_start
    }

    /// Start of the bucket containing `instant`.
    pub fn floor(&self, instant: DateTime<Utc>, granularity: Granularity) -> DateTime<Utc> {
        if let Some(unit) = granularity.fixed_duration() {
            return self.fixed_floor(instant, unit.num_seconds());
        }

        let date = to_local(&self.zone, instant).date();
        let truncated = match granularity {
            Granularity::Week => {
                let back = days_since(date.weekday(), self.week_start);
                date.checked_sub_days(Days::new(u64::from(back)))
                    .unwrap_or(date)
            }
            Granularity::Month => date.with_day(1).unwrap_or(date),
            _ => date,
        };
        self.midnight(truncated)
    }

    /// `instant` itself when it is a boundary, else the next boundary.
    pub fn ceil(&self, instant: DateTime<Utc>, granularity: Granularity) -> DateTime<Utc> {
        let floor = self.floor(instant, granularity);
        if floor == instant {
            return floor;
        }
        self.next_boundary(floor, granularity).unwrap_or(floor)
    }

    pub fn is_boundary(&self, instant: DateTime<Utc>, granularity: Granularity) -> bool {
        self.floor(instant, granularity) == instant
    }

    /// Boundary following the bucket that starts at `boundary`.
    ///
    /// Returns `None` only at the edge of the representable date range.
    pub fn next_boundary(
        &self,
        boundary: DateTime<Utc>,
        granularity: Granularity,
    ) -> Option<DateTime<Utc>> {
        if let Some(unit) = granularity.fixed_duration() {
            // An offset change that is not a whole unit merges two buckets,
            // so one unit ahead can floor back onto `boundary`.
            for units in 1..=3 {
                let next = self.floor(boundary.checked_add_signed(unit * units)?, granularity);
                if next > boundary {
                    return Some(next);
                }
            }
            return None;
        }

        let date = to_local(&self.zone, boundary).date();
        let next = match granularity {
            Granularity::Week => date.checked_add_days(Days::new(7))?,
            Granularity::Month => date.with_day(1)?.checked_add_months(Months::new(1))?,
            _ => date.checked_add_days(Days::new(1))?,
        };
        Some(self.midnight(next))
    }

    /// Start of the bucket immediately before `boundary`.
    pub fn previous_boundary(
        &self,
        boundary: DateTime<Utc>,
        granularity: Granularity,
    ) -> Option<DateTime<Utc>> {
        let just_before = boundary.checked_sub_signed(Duration::seconds(1))?;
        Some(self.floor(just_before, granularity))
    }

    /// Move `boundary` by `buckets` whole buckets (negative moves backward).
    pub fn step(
        &self,
        boundary: DateTime<Utc>,
        granularity: Granularity,
        buckets: i64,
    ) -> Option<DateTime<Utc>> {
        let mut current = boundary;
        for _ in 0..buckets.unsigned_abs() {
            current = if buckets < 0 {
                self.previous_boundary(current, granularity)?
            } else {
                self.next_boundary(current, granularity)?
            };
        }
        Some(current)
    }

    /// First instant of the local calendar day `date`.
    pub fn day_start(&self, date: NaiveDate) -> DateTime<Utc> {
        self.midnight(date)
    }

    /// First instant after the local calendar day `date`, so that an
    /// inclusive date selection `start..=end` covers
    /// `[day_start(start), day_end(end))`.
    pub fn day_end(&self, date: NaiveDate) -> DateTime<Utc> {
        match date.succ_opt() {
            Some(next) => self.midnight(next),
            None => self.midnight(date),
        }
    }

    /// Local wall-clock time of `instant`.
    pub fn local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        to_local(&self.zone, instant)
    }

    /// Instant for a wall-clock time, resolving DST overlaps and gaps.
    pub fn instant(&self, local: NaiveDateTime) -> DateTime<Utc> {
        from_local(&self.zone, local)
    }

    /// Wall-clock truncation to a fixed unit. The result must be aligned
    /// under its own offset, which differs from the offset at `instant` when
    /// a half-hour transition falls inside the bucket.
    fn fixed_floor(&self, instant: DateTime<Utc>, unit_secs: i64) -> DateTime<Utc> {
        let mut current = DateTime::from_timestamp(instant.timestamp(), 0).unwrap_or(instant);
        for _ in 0..4 {
            let offset = i64::from(self.zone.offset_at(current).local_minus_utc());
            let rem = (current.timestamp() + offset).rem_euclid(unit_secs);
            if rem == 0 {
                break;
            }
            match DateTime::from_timestamp(current.timestamp() - rem, 0) {
                Some(candidate) => current = candidate,
                None => break,
            }
        }
        current
    }

    fn midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        from_local(&self.zone, date.and_time(NaiveTime::MIN))
    }
}

/// Shift a wall-clock time by whole months. Days past the end of the
/// target month clamp to its last day (Mar 31 - 1 month = Feb 28/29).
pub fn shift_months(local: NaiveDateTime, months: i32) -> Option<NaiveDateTime> {
    let magnitude = Months::new(months.unsigned_abs());
    if months < 0 {
        local.checked_sub_months(magnitude)
    } else {
        local.checked_add_months(magnitude)
    }
}

fn days_since(day: Weekday, start: Weekday) -> u32 {
    (day.num_days_from_monday() + 7 - start.num_days_from_monday()) % 7
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};
    use chrono_tz::Tz;

    use super::*;
    use crate::zone::FixedRuleZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s)
            .single()
            .expect("valid utc")
    }

    fn calendar(name: &str) -> Calendar<Tz> {
        Calendar::new(name.parse::<Tz>().expect("tz"))
    }

    #[test]
    fn hour_floor_on_fall_back_day_uses_standard_offset() {
        let cal = calendar("America/New_York");
        // 06:30Z is 01:30 EST, the second 01:00 hour of the day.
        let floored = cal.floor(utc(2024, 11, 3, 6, 30, 0), Granularity::Hour);
        assert_eq!(floored, utc(2024, 11, 3, 6, 0, 0));
        // 05:30Z is 01:30 EDT, the first 01:00 hour.
        let floored = cal.floor(utc(2024, 11, 3, 5, 30, 0), Granularity::Hour);
        assert_eq!(floored, utc(2024, 11, 3, 5, 0, 0));
    }

    #[test]
    fn hour_floor_respects_half_hour_offsets() {
        let cal = calendar("Asia/Kolkata");
        // 10:10Z = 15:40 IST; bucket starts 15:00 IST = 09:30Z.
        let floored = cal.floor(utc(2024, 6, 1, 10, 10, 0), Granularity::Hour);
        assert_eq!(floored, utc(2024, 6, 1, 9, 30, 0));
    }

    #[test]
    fn hour_floor_lands_on_a_boundary_across_half_hour_transitions() {
        let cal = calendar("Australia/Lord_Howe");

        // 2024-04-07 02:00 +11:00 falls back to 01:30 +10:30 (15:00Z), so
        // local 01:00 +11:00 starts a 90-minute bucket.
        let floor = cal.floor(utc(2024, 4, 6, 15, 10, 0), Granularity::Hour);
        assert_eq!(floor, utc(2024, 4, 6, 14, 0, 0));
        assert!(cal.is_boundary(floor, Granularity::Hour));
        assert_eq!(cal.floor(utc(2024, 4, 6, 14, 30, 0), Granularity::Hour), floor);
        assert_eq!(
            cal.next_boundary(floor, Granularity::Hour),
            Some(utc(2024, 4, 6, 15, 30, 0))
        );

        // 2024-10-06 02:00 +10:30 springs forward to 02:30 +11:00 (15:30Z).
        let floor = cal.floor(utc(2024, 10, 5, 15, 40, 0), Granularity::Hour);
        assert_eq!(floor, utc(2024, 10, 5, 14, 30, 0));
        assert_eq!(
            cal.next_boundary(floor, Granularity::Hour),
            Some(utc(2024, 10, 5, 16, 0, 0))
        );
    }

    #[test]
    fn minute_floor_drops_seconds() {
        let cal = calendar("UTC");
        let instant = utc(2024, 6, 1, 10, 10, 42) + Duration::milliseconds(250);
        assert_eq!(cal.floor(instant, Granularity::Minute), utc(2024, 6, 1, 10, 10, 0));
    }

    #[test]
    fn day_floor_uses_local_midnight() {
        let cal = calendar("Europe/Berlin");
        // 2024-06-01 23:30Z is 2024-06-02 01:30 CEST.
        let floored = cal.floor(utc(2024, 6, 1, 23, 30, 0), Granularity::Day);
        assert_eq!(floored, utc(2024, 6, 1, 22, 0, 0));
    }

    #[test]
    fn week_floor_defaults_to_monday() {
        let cal = calendar("UTC");
        // 2024-06-06 is a Thursday.
        let floored = cal.floor(utc(2024, 6, 6, 12, 0, 0), Granularity::Week);
        assert_eq!(floored, utc(2024, 6, 3, 0, 0, 0));
    }

    #[test]
    fn week_floor_honours_configured_start() {
        let cal = calendar("UTC").with_week_start(Weekday::Sun);
        let floored = cal.floor(utc(2024, 6, 6, 12, 0, 0), Granularity::Week);
        assert_eq!(floored, utc(2024, 6, 2, 0, 0, 0));
        // A Sunday floors to itself.
        let floored = cal.floor(utc(2024, 6, 2, 8, 0, 0), Granularity::Week);
        assert_eq!(floored, utc(2024, 6, 2, 0, 0, 0));
    }

    #[test]
    fn month_floor_truncates_to_first_day() {
        let cal = calendar("America/Los_Angeles");
        // 2024-03-01 05:00Z is still 2024-02-29 21:00 PST.
        let floored = cal.floor(utc(2024, 3, 1, 5, 0, 0), Granularity::Month);
        assert_eq!(floored, utc(2024, 2, 1, 8, 0, 0));
    }

    #[test]
    fn ceil_keeps_boundaries_and_rounds_up_otherwise() {
        let cal = calendar("UTC");
        let boundary = utc(2024, 6, 7, 0, 0, 0);
        assert_eq!(cal.ceil(boundary, Granularity::Day), boundary);
        assert_eq!(
            cal.ceil(utc(2024, 6, 7, 0, 0, 1), Granularity::Day),
            utc(2024, 6, 8, 0, 0, 0)
        );
        assert!(cal.is_boundary(boundary, Granularity::Day));
    }

    #[test]
    fn day_boundaries_follow_dst_lengths() {
        let cal = calendar("America/New_York");
        let start = cal.floor(utc(2024, 3, 10, 12, 0, 0), Granularity::Day);
        let next = cal.next_boundary(start, Granularity::Day).expect("next");
        assert_eq!(next - start, Duration::hours(23));
        assert_eq!(cal.previous_boundary(next, Granularity::Day), Some(start));
    }

    #[test]
    fn month_steps_use_calendar_lengths() {
        let cal = calendar("UTC");
        let jan = utc(2024, 1, 1, 0, 0, 0);
        assert_eq!(
            cal.step(jan, Granularity::Month, -3),
            Some(utc(2023, 10, 1, 0, 0, 0))
        );
        assert_eq!(
            cal.step(jan, Granularity::Month, 2),
            Some(utc(2024, 3, 1, 0, 0, 0))
        );
    }

    #[test]
    fn day_start_and_end_bracket_an_inclusive_date() {
        let cal = calendar("Europe/Berlin");
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).expect("date");
        assert_eq!(cal.day_start(date), utc(2024, 5, 31, 22, 0, 0));
        assert_eq!(cal.day_end(date), utc(2024, 6, 1, 22, 0, 0));
    }

    #[test]
    fn fixed_rule_zone_floors_like_the_real_database() {
        let zone = FixedRuleZone::new("Test/Eastern", FixedOffset::west_opt(5 * 3600).expect("est"))
            .with_daylight(
                FixedOffset::west_opt(4 * 3600).expect("edt"),
                utc(2024, 3, 10, 7, 0, 0),
                utc(2024, 11, 3, 6, 0, 0),
            );
        let cal = Calendar::new(zone);
        assert_eq!(
            cal.floor(utc(2024, 11, 3, 6, 30, 0), Granularity::Hour),
            utc(2024, 11, 3, 6, 0, 0)
        );
        assert_eq!(
            cal.floor(utc(2024, 11, 3, 12, 0, 0), Granularity::Day),
            utc(2024, 11, 3, 4, 0, 0)
        );
    }

    #[test]
    fn shift_months_clamps_to_last_day_of_target_month() {
        let local = NaiveDate::from_ymd_opt(2024, 3, 31)
            .expect("date")
            .and_hms_opt(0, 0, 0)
            .expect("time");
        let shifted = shift_months(local, -1).expect("shift");
        assert_eq!(shifted.date(), NaiveDate::from_ymd_opt(2024, 2, 29).expect("date"));

        let leap_day = NaiveDate::from_ymd_opt(2024, 2, 29)
            .expect("date")
            .and_hms_opt(0, 0, 0)
            .expect("time");
        let shifted = shift_months(leap_day, -12).expect("shift");
        assert_eq!(shifted.date(), NaiveDate::from_ymd_opt(2023, 2, 28).expect("date"));
    }
}
