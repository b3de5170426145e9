pub mod period;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::date_util::{date_key, DATE_KEY_FORMAT};
use crate::error::{Error, Result};

pub use period::Period;

/// An inclusive `[start, end]` window of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::MalformedRange(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse a `"<start>/<end>"` token.
    ///
    /// Each side is either a plain `YYYY-MM-DD` date or an RFC 3339
    /// timestamp, which is normalized to its UTC calendar day.
    pub fn parse(token: &str) -> Result<Self> {
        let (start, end) = date_range_split(token)?;
        Self::new(start, end)
    }

    pub fn contains(&self, d: NaiveDate) -> bool {
        d >= self.start && d <= self.end
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Bounds as `YYYY-MM-DD` keys for SQL comparisons.
    pub fn keys(&self) -> (String, String) {
        (date_key(self.start), date_key(self.end))
    }

    /// Canonical wire token (`YYYY-MM-DD/YYYY-MM-DD`).
    pub fn to_token(&self) -> String {
        format!("{}/{}", date_key(self.start), date_key(self.end))
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_token())
    }
}

/// A primary and comparison range, with the tokens they were parsed from.
///
/// Tokens are kept exactly as received; they name cache entries and are
/// echoed back in payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangePair {
    pub primary: DateRange,
    pub comparison: DateRange,
    pub primary_token: String,
    pub comparison_token: String,
}

impl RangePair {
    pub fn parse(primary_token: &str, comparison_token: &str) -> Result<Self> {
        Ok(Self {
            primary: DateRange::parse(primary_token)?,
            comparison: DateRange::parse(comparison_token)?,
            primary_token: primary_token.to_string(),
            comparison_token: comparison_token.to_string(),
        })
    }

    /// Ranges of a named period and the period before it, with canonical tokens.
    pub fn from_period(period: &Period) -> Result<Self> {
        let (primary, comparison) = period.ranges()?;
        Ok(Self {
            primary_token: primary.to_token(),
            comparison_token: comparison.to_token(),
            primary,
            comparison,
        })
    }
}

/// Split a range token into its two boundary dates without checking order.
pub fn date_range_split(token: &str) -> Result<(NaiveDate, NaiveDate)> {
    let parts: Vec<&str> = token.trim().split('/').collect();
    if parts.len() != 2 {
        return Err(Error::MalformedRange(format!(
            "expected <start>/<end>, got {token:?}"
        )));
    }
    let start = parse_boundary(parts[0])
        .ok_or_else(|| Error::MalformedRange(format!("invalid start date in {token:?}")))?;
    let end = parse_boundary(parts[1])
        .ok_or_else(|| Error::MalformedRange(format!("invalid end date in {token:?}")))?;
    Ok((start, end))
}

fn parse_boundary(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, DATE_KEY_FORMAT) {
        return Some(d);
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}
