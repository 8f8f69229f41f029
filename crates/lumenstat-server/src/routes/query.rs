use chrono::{DateTime, Duration, NaiveDate, Utc};

use lumenstat_core::{Calendar, RangeError, ZoneRules};

use crate::error::AppError;

/// Which side of an inclusive selection a date bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bound {
    Start,
    End,
}

/// Parse a selection bound. `YYYY-MM-DD` is an inclusive local calendar
/// date; anything else must be an RFC 3339 instant.
pub(crate) fn parse_bound<Z: ZoneRules>(
    calendar: &Calendar<Z>,
    raw: &str,
    field: &'static str,
    bound: Bound,
) -> Result<DateTime<Utc>, AppError> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(match bound {
            Bound::Start => calendar.day_start(date),
            Bound::End => calendar.day_end(date),
        });
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::Range(RangeError::InvalidDate { field }))
}

pub(crate) fn parse_optional_bound<Z: ZoneRules>(
    calendar: &Calendar<Z>,
    raw: Option<&str>,
    field: &'static str,
    bound: Bound,
) -> Result<Option<DateTime<Utc>>, AppError> {
    raw.map(|raw| parse_bound(calendar, raw, field, bound))
        .transpose()
}

/// Resolve the main selection, defaulting to the last
/// `default_lookback_days + 1` local days ending today.
pub(crate) fn parse_defaulted_selection<Z: ZoneRules>(
    calendar: &Calendar<Z>,
    start: Option<&str>,
    end: Option<&str>,
    default_lookback_days: i64,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let today = calendar.local(Utc::now()).date();
    let start = match parse_optional_bound(calendar, start, "start_date", Bound::Start)? {
        Some(start) => start,
        None => calendar.day_start(today - Duration::days(default_lookback_days)),
    };
    let end = match parse_optional_bound(calendar, end, "end_date", Bound::End)? {
        Some(end) => end,
        None => calendar.day_end(today),
    };
    Ok((start, end))
}

/// Local calendar dates spanned by `[start, end)`, for auto-granularity.
pub(crate) fn local_date_span<Z: ZoneRules>(
    calendar: &Calendar<Z>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> (NaiveDate, NaiveDate) {
    let last = (end - Duration::seconds(1)).max(start);
    (
        calendar.local(start).date(),
        calendar.local(last).date(),
    )
}

/// Website ids are opaque slugs; reject anything that could not be one
/// before doing any work.
pub(crate) fn validate_website_id(website_id: &str) -> Result<(), AppError> {
    let valid = !website_id.is_empty()
        && website_id.len() <= 64
        && website_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(AppError::NotFound("Website not found".to_string()));
    }
    Ok(())
}
