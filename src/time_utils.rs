// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and calendar arithmetic.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, SecondsFormat, TimeZone, Utc};

/// Longest range accepted for batch operations.
pub const MAX_RANGE_DAYS: i64 = 366;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Every calendar day from `start` to `end`, inclusive. Empty if `end < start`.
pub fn dates_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Midnight UTC at the start of `date`.
pub fn start_of_day_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or_default()
}

/// Parse a Whoop-style offset ("-05:00", "+0100", "Z") into a fixed offset.
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    if raw == "Z" {
        return Some(Utc.fix());
    }
    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Calendar date of `instant` as seen at `offset` (UTC when absent or unparseable).
pub fn local_date(instant: DateTime<Utc>, offset: Option<&str>) -> NaiveDate {
    let offset = offset
        .and_then(parse_utc_offset)
        .unwrap_or_else(|| Utc.fix());
    offset.from_utc_datetime(&instant.naive_utc()).date_naive()
}
