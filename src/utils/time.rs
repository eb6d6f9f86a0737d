use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

/// Naive layouts accepted when the model omits the offset; these are local to the bot's timezone
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// Pin a wall-clock time to `tz`. A time repeated by a DST change resolves to
/// its first occurrence, one skipped by a DST change moves an hour forward.
pub fn from_local(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    let local = match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()?,
    };
    Some(local.with_timezone(&Utc))
}

/// Parse an ISO-8601 timestamp. Values without an offset are wall-clock times in `tz`.
pub fn parse_timestamp(value: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .and_then(|naive| from_local(naive, tz))
}

/// Format a timestamp as RFC 3339 with a `Z` suffix
pub fn to_iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Human readable date in the given timezone, or the raw value if it can't be parsed
pub fn display_date(value: &str, tz: Tz) -> String {
    match parse_timestamp(value, tz) {
        Some(dt) => dt.with_timezone(&tz).format("%a %d.%m.%Y").to_string(),
        None => value.to_string(),
    }
}

/// Human readable time of day in the given timezone, or the raw value if it can't be parsed
pub fn display_time(value: &str, tz: Tz) -> String {
    match parse_timestamp(value, tz) {
        Some(dt) => dt.with_timezone(&tz).format("%H:%M").to_string(),
        None => value.to_string(),
    }
}
