//! Date formatting for NetSuite's `YYYY-MM-DD` convention.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::Result;

const NETSUITE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Format a date the way NetSuite search filters expect it.
pub fn format_date(date: NaiveDate) -> String {
    date.format(NETSUITE_DATE_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` string into a timestamp at UTC midnight.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(input, NETSUITE_DATE_FORMAT)?;
    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}
