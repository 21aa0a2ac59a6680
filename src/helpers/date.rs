//! Date helper functions

use chrono::{DateTime, Locale, TimeZone, Utc};
use chrono_tz::Tz;

/// Listing and byline dates, e.g. "25 mar 2021"
pub const DATE_PATTERN: &str = "%-d %b %Y";

/// Edit note dates, e.g. "25 mar 2021, às 15:31"
pub const DATE_TIME_PATTERN: &str = "%-d %b %Y, às %-H:%M";

/// Format a date with a strftime pattern and Brazilian Portuguese names
///
/// # Examples
/// ```ignore
/// format_date(&date, "%-d %b %Y") // -> "25 mar 2021"
/// ```
pub fn format_date<Tz2: TimeZone>(date: &DateTime<Tz2>, pattern: &str) -> String
where
    Tz2::Offset: std::fmt::Display,
{
    date.format_localized(pattern, Locale::pt_BR).to_string()
}

/// Publication date in the site timezone
pub fn post_date(date: &DateTime<Utc>, tz: Tz) -> String {
    format_date(&date.with_timezone(&tz), DATE_PATTERN)
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz2: TimeZone>(date: &DateTime<Tz2>) -> String
where
    Tz2::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
}
