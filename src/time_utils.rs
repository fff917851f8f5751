// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.
//!
//! Timestamps are persisted as second-precision RFC3339 strings with a `Z`
//! suffix so that Firestore string ordering matches chronological ordering.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time in the persisted timestamp format.
pub fn now_rfc3339() -> String {
    format_utc_rfc3339(Utc::now())
}

/// Parse any RFC3339 timestamp into UTC.
pub fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Parse an `HH:MM` wall-clock time.
pub fn parse_hhmm(raw: &str) -> Option<NaiveTime> {
    if raw.len() != 5 {
        return None;
    }
    NaiveTime::parse_from_str(raw, "%H:%M").ok()
}

/// Build a fixed offset from minutes east of UTC (negative is west).
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

/// Today's calendar date in the given offset.
pub fn today_in(offset: FixedOffset, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// Normalize a query bound to the stored timestamp format.
///
/// Accepts RFC3339 or a bare `YYYY-MM-DD`. A bare date used as an exclusive
/// upper bound (`end = true`) means "through the end of that day".
pub fn parse_bound(raw: &str, end: bool) -> Option<String> {
    if let Some(at) = parse_rfc3339(raw) {
        return Some(format_utc_rfc3339(at));
    }
    let day = parse_date(raw)?;
    let day = if end { day.succ_opt()? } else { day };
    Some(format_utc_rfc3339(day.and_time(NaiveTime::MIN).and_utc()))
}
