//! Publication timestamps.
//!
//! Dates in book and chapter config may be written at any precision, from a
//! bare year to a full timestamp with offset. Accepted layouts, tried in
//! order:
//!
//! ```text
//! 2024-05-01T18:30:00+02:00    RFC 3339 (also with Z or fractional seconds)
//! 2024-05-01 18:30:00+02:00   (also with fractional seconds)
//! 2024-05-01T18:30+02:00
//! 2024-05-01 18:30+02:00
//! 2024-05-01T18:30:00.250      naive layouts are taken as UTC
//! 2024-05-01 18:30:00.250
//! 2024-05-01T18:30:00
//! 2024-05-01 18:30:00
//! 2024-05-01T18:30
//! 2024-05-01 18:30
//! 2024-05-01
//! 2024-05                      first day of the month
//! 2024                         first day of the year
//! ```

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::fmt;

const OFFSET_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublishDate(DateTime<FixedOffset>);

impl PublishDate {
    /// Parse a date in any of the accepted layouts. Returns `None` when no
    /// layout matches.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Some(Self(dt));
        }

        // chrono's %:z does not accept a literal Z
        let with_offset = match input.strip_suffix('Z') {
            Some(rest) => format!("{rest}+00:00"),
            None => input.to_string(),
        };
        for layout in OFFSET_LAYOUTS {
            if let Ok(dt) = DateTime::parse_from_str(&with_offset, layout) {
                return Some(Self(dt));
            }
        }

        for layout in NAIVE_LAYOUTS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, layout) {
                return Some(Self::from_naive(naive));
            }
        }

        parse_partial_date(input)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(Self::from_naive)
    }

    fn from_naive(naive: NaiveDateTime) -> Self {
        Self(naive.and_utc().fixed_offset())
    }

    pub fn as_datetime(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// `YYYY-MM-DD`, `YYYY-MM` or `YYYY`.
fn parse_partial_date(input: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date);
    }
    let mut parts = input.splitn(2, '-');
    let year = parts.next()?;
    if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    match parts.next() {
        None => NaiveDate::from_ymd_opt(year, 1, 1),
        Some(month) if month.len() == 2 => NaiveDate::from_ymd_opt(year, month.parse().ok()?, 1),
        Some(_) => None,
    }
}

impl fmt::Display for PublishDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl Serialize for PublishDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
