//! Collection window and snapshot directory naming
//!
//! A run collects logs for a single [`TimeWindow`]. The window also names the snapshot directory
//! the run writes into: `<start>-<end>`, both stamps in the fixed `YYYYMMDDThhmmssZ` format. The
//! retention pruner reads the end stamp back from those names on a later run.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

/// Format accepted for the user supplied window start
pub const START_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of each stamp embedded in a snapshot directory name
pub const STAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Width of a snapshot directory name: two 16 character stamps and a dash
pub const SNAPSHOT_NAME_LEN: usize = 33;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("cannot parse start time {input:?}, expected UTC time as YYYY-MM-DD HH:MM:SS")]
    Start {
        input: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("duration {0:?} is out of range")]
    DurationOutOfRange(std::time::Duration),
}

/// Immutable `[start, end]` time range, `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

fn to_delta(duration: std::time::Duration) -> Result<TimeDelta, ParseError> {
    TimeDelta::from_std(duration).map_err(|_| ParseError::DurationOutOfRange(duration))
}

impl TimeWindow {
    /// Window beginning at `start` and lasting `duration`.
    pub fn new(start: DateTime<Utc>, duration: std::time::Duration) -> Result<Self, ParseError> {
        let end = start
            .checked_add_signed(to_delta(duration)?)
            .ok_or(ParseError::DurationOutOfRange(duration))?;
        Ok(Self { start, end })
    }

    /// Window of length `duration` that ends at `now`.
    pub fn ending_at(now: DateTime<Utc>, duration: std::time::Duration) -> Result<Self, ParseError> {
        let start = now
            .checked_sub_signed(to_delta(duration)?)
            .ok_or(ParseError::DurationOutOfRange(duration))?;
        Ok(Self { start, end: now })
    }

    /// Parses a start time in [`START_FORMAT`] (interpreted as UTC) and adds `duration`.
    pub fn parse(start: &str, duration: std::time::Duration) -> Result<Self, ParseError> {
        let start = parse_start(start)?;
        Self::new(start, duration)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Name of the snapshot directory holding logs for this window
    pub fn snapshot_name(&self) -> String {
        format!(
            "{}-{}",
            self.start.format(STAMP_FORMAT),
            self.end.format(STAMP_FORMAT)
        )
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format(START_FORMAT),
            self.end.format(START_FORMAT)
        )
    }
}

pub fn parse_start(input: &str) -> Result<DateTime<Utc>, ParseError> {
    NaiveDateTime::parse_from_str(input.trim(), START_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| ParseError::Start {
            input: input.to_string(),
            source,
        })
}

/// Returns the window end encoded in a snapshot directory name.
///
/// Names that don't have the exact snapshot shape return `None`; those directories don't belong
/// to us and must be left alone.
pub fn snapshot_end(name: &str) -> Option<DateTime<Utc>> {
    if name.len() != SNAPSHOT_NAME_LEN {
        return None;
    }
    let parts: Vec<&str> = name.split('-').collect();
    if parts.len() != 2 {
        return None;
    }
    NaiveDateTime::parse_from_str(parts[1], STAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
