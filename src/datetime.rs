//! HL7 DTM values, e.g. `20230615143000`, `20230615` or
//! `20041104082400.0000+0100`.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use log::debug;

use crate::error::ParseError;

const DATE_FORMAT: &str = "%Y%m%d";
const WIRE_FORMAT: &str = "%Y%m%d%H%M%S";

/// A date/time as written on the wire: the wall-clock value, plus the UTC
/// offset when the value carried one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub local: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

impl Timestamp {
    pub fn new(local: NaiveDateTime) -> Self {
        Timestamp { local, offset: None }
    }

    pub fn with_offset(local: NaiveDateTime, offset: FixedOffset) -> Self {
        Timestamp {
            local,
            offset: Some(offset),
        }
    }

    /// The instant this names, when the offset is known.
    pub fn to_datetime(&self) -> Option<DateTime<FixedOffset>> {
        let offset = self.offset?;
        self.local.and_local_timezone(offset).single()
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(local: NaiveDateTime) -> Self {
        Timestamp::new(local)
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Timestamp::with_offset(dt.naive_local(), *dt.offset())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_timestamp(self))
    }
}

enum Pattern {
    DateTime(&'static str),
    /// hour only, chrono needs minutes so `00` is appended before parsing
    Hour,
    Date,
    /// carries a UTC offset
    Offset(&'static str),
}

// Tried in order, the first match wins.
const PATTERNS: &[Pattern] = &[
    Pattern::DateTime("%Y%m%d%H%M%S"),
    Pattern::DateTime("%Y%m%d%H%M"),
    Pattern::Hour,
    Pattern::Date,
    Pattern::DateTime("%Y%m%d%H%M%S%.f"),
    Pattern::Offset("%Y%m%d%H%M%S%z"),
    Pattern::Offset("%Y%m%d%H%M%S%.f%z"),
    Pattern::Offset("%Y%m%d%H%M%z"),
];

impl Pattern {
    fn parse(&self, value: &str) -> Option<Timestamp> {
        match self {
            Pattern::DateTime(format) => NaiveDateTime::parse_from_str(value, format)
                .ok()
                .map(Timestamp::new),
            Pattern::Hour => {
                if value.len() != 10 {
                    return None;
                }
                NaiveDateTime::parse_from_str(&format!("{}00", value), "%Y%m%d%H%M")
                    .ok()
                    .map(Timestamp::new)
            }
            Pattern::Date => NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(Timestamp::new),
            Pattern::Offset(format) => DateTime::parse_from_str(value, format)
                .ok()
                .map(Timestamp::from),
        }
    }
}

/// Parses an HL7 date/time, failing when no known format matches.
pub fn parse_timestamp_strict(value: &str) -> Result<Timestamp, ParseError> {
    let value = value.trim();
    PATTERNS
        .iter()
        .find_map(|p| p.parse(value))
        .ok_or_else(|| ParseError::DateFieldUnparseable(value.to_string()))
}

/// Parses an HL7 date/time for segment decoding.  Empty or unrecognised
/// values give `None`, they never fail the segment.
pub fn parse_timestamp(value: &str) -> Option<Timestamp> {
    if value.trim().is_empty() {
        return None;
    }
    match parse_timestamp_strict(value) {
        Ok(ts) => Some(ts),
        Err(e) => {
            debug!("{}, leaving the field unset", e);
            None
        }
    }
}

/// Formats a timestamp the way outbound messages carry it: to the second,
/// with fractional seconds only when there are any, then the offset if known.
pub fn format_timestamp(ts: &Timestamp) -> String {
    let mut out = ts.local.format(WIRE_FORMAT).to_string();
    if ts.local.nanosecond() != 0 {
        out.push_str(&ts.local.format("%.f").to_string());
    }
    if let Some(offset) = ts.offset {
        let seconds = offset.local_minus_utc();
        let minutes = seconds.abs() / 60;
        let sign = if seconds < 0 { '-' } else { '+' };
        out.push_str(&format!("{}{:02}{:02}", sign, minutes / 60, minutes % 60));
    }
    out
}

/// The current local time truncated to whole seconds, used for MSH-7 and EVN-2.
pub(crate) fn now() -> Timestamp {
    let now = chrono::Local::now().naive_local();
    Timestamp::new(now.with_nanosecond(0).unwrap_or(now))
}
