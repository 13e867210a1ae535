use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DATE_ONLY: &str = "%Y-%m-%d";
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const OFFSET_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

/// Turns a stored interval endpoint into a calendar day.
///
/// Bare dates keep their year/month/day as written. Anything carrying a time of day
/// contributes its UTC date, so `2024-03-01T00:00:00Z` stays on March 1st no matter
/// which offset the caller runs in. Timestamps without an offset are read as UTC.
pub fn normalize_endpoint(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_ONLY) {
        return Some(date);
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc).date_naive());
    }

    for format in OFFSET_TIMESTAMP_FORMATS {
        if let Ok(timestamp) = DateTime::parse_from_str(raw, format) {
            return Some(timestamp.with_timezone(&Utc).date_naive());
        }
    }

    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|timestamp| timestamp.and_utc().date_naive())
}
