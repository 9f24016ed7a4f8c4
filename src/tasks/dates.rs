//! Parsing and formatting of user-supplied dates.
//!
//! All timestamps are stored in UTC. A date without a time is midnight UTC.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Which end of a day a bare date resolves to when used as a range bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayEdge {
    /// Midnight at the start of the day.
    Start,
    /// The last representable instant of the day.
    End,
}

/// Parse a date or datetime relative to `now`.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY-MM-DD HH:MM[:SS]`, RFC 3339,
/// and the words `today`, `tomorrow`, `yesterday`, `next week`, `next month`.
///
/// # Errors
///
/// Returns a validation error if the input matches none of the accepted forms.
pub fn parse_datetime(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    parse_with_edge(input, now, DayEdge::Start)
}

/// Parse a date for use as a range bound.
///
/// With [`DayEdge::End`], inputs that name a whole day cover the entire day so
/// an inclusive "before" bound includes tasks from later that day.
///
/// # Errors
///
/// Returns a validation error if the input cannot be parsed.
pub fn parse_with_edge(input: &str, now: DateTime<Utc>, edge: DayEdge) -> Result<DateTime<Utc>> {
    let text = input.trim();
    let lowered = text.to_lowercase();

    let relative_day = match lowered.as_str() {
        "today" => Some(0),
        "tomorrow" => Some(1),
        "yesterday" => Some(-1),
        "next week" => Some(7),
        "next month" => Some(30),
        _ => None,
    };
    if let Some(days) = relative_day {
        let day = (now + Duration::days(days)).date_naive();
        return Ok(day_edge(day, edge));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(day) = NaiveDate::parse_from_str(text, format) {
            return Ok(day_edge(day, edge));
        }
    }

    Err(Error::validation(format!(
        "invalid date '{input}': use YYYY-MM-DD, YYYY-MM-DD HH:MM, or today/tomorrow/next week"
    )))
}

fn day_edge(day: NaiveDate, edge: DayEdge) -> DateTime<Utc> {
    match edge {
        DayEdge::Start => day.and_time(NaiveTime::MIN).and_utc(),
        DayEdge::End => {
            (day.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::microseconds(1)).and_utc()
        }
    }
}

/// Format a timestamp for storage.
///
/// Fixed-width RFC 3339 with microseconds, so lexical order equals time order.
#[must_use]
pub fn to_storage(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
///
/// # Errors
///
/// Returns a validation error if the text is not RFC 3339.
pub fn from_storage(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::validation(format!("invalid stored timestamp '{text}': {e}")))
}

/// Truncate a timestamp to the precision kept by storage.
#[must_use]
pub fn storage_precision(dt: DateTime<Utc>) -> DateTime<Utc> {
    from_storage(&to_storage(dt)).unwrap_or(dt)
}
