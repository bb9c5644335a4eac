use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Slack added before truncating float seconds to whole milliseconds, so that
/// values like `0.3 * 1000.0 = 299.99999999999994` land on 300.
const MS_EPSILON: f64 = 1e-6;

/// A subtitle timestamp (`HH:MM:SS,mmm`) with millisecond resolution.
///
/// Always non-negative. Hours are not wrapped at 24; anything past 99 hours is
/// formatted with as many hour digits as it needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    millis: u64,
}

/// Which way [`Timestamp::shift`] moves a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDirection {
    Forward,
    /// Clamps at `00:00:00,000`.
    Backward,
}

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp { millis: 0 };

    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    pub fn as_millis(&self) -> u64 {
        self.millis
    }

    /// Convert elapsed seconds (e.g. a cumulative playback position) into a
    /// timestamp, truncating sub-millisecond precision. Negative and NaN
    /// inputs become zero.
    pub fn from_seconds(seconds: f64) -> Self {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Self::ZERO;
        }
        Self {
            millis: (seconds * 1000.0 + MS_EPSILON) as u64,
        }
    }

    pub fn as_seconds(&self) -> f64 {
        self.millis as f64 / 1000.0
    }

    /// Parse `HH:MM:SS,mmm`.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || Error::InvalidTimestamp(text.to_string());

        let (clock, millis) = text.split_once(',').ok_or_else(invalid)?;
        let mut parts = clock.split(':');
        let (Some(hours), Some(minutes), Some(seconds), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        if hours.len() < 2 || minutes.len() != 2 || seconds.len() != 2 || millis.len() != 3 {
            return Err(invalid());
        }

        let hours = parse_digits(hours).ok_or_else(invalid)?;
        let minutes = parse_digits(minutes).ok_or_else(invalid)?;
        let seconds = parse_digits(seconds).ok_or_else(invalid)?;
        let millis = parse_digits(millis).ok_or_else(invalid)?;

        if minutes >= 60 || seconds >= 60 {
            return Err(invalid());
        }

        let total = hours
            .checked_mul(3_600_000)
            .and_then(|h| h.checked_add(minutes * 60_000 + seconds * 1_000 + millis))
            .ok_or_else(invalid)?;

        Ok(Self { millis: total })
    }

    /// Move the timestamp by `delta`. Moving backward past zero yields zero.
    pub fn shift(self, delta: Duration, direction: ShiftDirection) -> Self {
        let delta_ms = u64::try_from(delta.as_millis()).unwrap_or(u64::MAX);
        let millis = match direction {
            ShiftDirection::Forward => self.millis.saturating_add(delta_ms),
            ShiftDirection::Backward => self.millis.saturating_sub(delta_ms),
        };
        Self { millis }
    }
}

/// Digits only; rejects signs, whitespace and empty strings that `str::parse`
/// would otherwise accept or reject inconsistently.
fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.millis / 3_600_000;
        let m = (self.millis % 3_600_000) / 60_000;
        let s = (self.millis % 60_000) / 1_000;
        let ms = self.millis % 1_000;
        write!(f, "{h:02}:{m:02}:{s:02},{ms:03}")
    }
}

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
