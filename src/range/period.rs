use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use regex::Regex;

use crate::date_util::{last_day_of_month, quarter_of};
use crate::error::{Error, Result};
use crate::range::DateRange;

static RE_QUARTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-Q([1-4])$").expect("valid regex"));
static RE_WEEK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-W(\d{1,2})$").expect("valid regex"));
static RE_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})$").expect("valid regex"));

/// A named reporting window that resolves to a primary range and the
/// equivalent window immediately before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Year(i32),
    Quarter(i32, u8),
    Month(i32, u8),
    Week(i32, u8),
    /// Last N days ending on the given date.
    Rolling(u32, NaiveDate),
}

impl Period {
    /// Parse a period string relative to today (UTC).
    pub fn parse(s: &str) -> Result<Self> {
        Self::parse_as_of(s, chrono::Utc::now().date_naive())
    }

    /// Parse a period string.
    ///
    /// Supported formats:
    /// - `2025`: year
    /// - `2025-Q1`: quarter
    /// - `2025-01`: month
    /// - `2025-W05`: ISO week
    /// - `30d`: rolling last N days ending yesterday
    /// - `last-week`, `last-month`, `last-quarter`, `last-year`: the most
    ///   recent complete window before `today`
    pub fn parse_as_of(s: &str, today: NaiveDate) -> Result<Self> {
        let s = s.trim();
        let yesterday = today - Duration::days(1);

        match s.to_lowercase().as_str() {
            "last-week" => {
                let iw = (today - Duration::days(7)).iso_week();
                return Ok(Period::Week(iw.year(), iw.week() as u8));
            }
            "last-month" => {
                let prev = today.with_day(1).unwrap_or(today) - Duration::days(1);
                return Ok(Period::Month(prev.year(), prev.month() as u8));
            }
            "last-quarter" => {
                return Ok(Period::Quarter(today.year(), quarter_of(today)).previous());
            }
            "last-year" => {
                return Ok(Period::Year(today.year() - 1));
            }
            _ => {}
        }

        // Rolling: "30d", "7d", etc.
        if let Some(n) = s.strip_suffix(['d', 'D']) {
            if let Ok(n) = n.parse::<u32>() {
                if n == 0 {
                    return Err(Error::PeriodParse(format!("empty rolling window: {s}")));
                }
                return Ok(Period::Rolling(n, yesterday));
            }
        }

        // Year: "2025"
        if s.len() == 4 {
            if let Ok(year) = s.parse::<i32>() {
                return Ok(Period::Year(year));
            }
        }

        if let Some(caps) = RE_QUARTER.captures(s) {
            let year = parse_capture::<i32>(&caps[1], s)?;
            let q = parse_capture::<u8>(&caps[2], s)?;
            return Ok(Period::Quarter(year, q));
        }

        if let Some(caps) = RE_WEEK.captures(s) {
            let year = parse_capture::<i32>(&caps[1], s)?;
            let week = parse_capture::<u8>(&caps[2], s)?;
            if NaiveDate::from_isoywd_opt(year, week as u32, Weekday::Mon).is_some() {
                return Ok(Period::Week(year, week));
            }
        }

        if let Some(caps) = RE_MONTH.captures(s) {
            let year = parse_capture::<i32>(&caps[1], s)?;
            let month = parse_capture::<u8>(&caps[2], s)?;
            if (1..=12).contains(&month) {
                return Ok(Period::Month(year, month));
            }
        }

        Err(Error::PeriodParse(format!("unrecognized period: {s}")))
    }

    /// Canonical key string.
    pub fn to_key(&self) -> String {
        match self {
            Period::Year(y) => format!("{y}"),
            Period::Quarter(y, q) => format!("{y}-Q{q}"),
            Period::Month(y, m) => format!("{y}-{m:02}"),
            Period::Week(y, w) => format!("{y}-W{w:02}"),
            Period::Rolling(n, _) => format!("{n}d"),
        }
    }

    /// The inclusive date range covered by this period.
    pub fn date_range(&self) -> Result<DateRange> {
        let invalid = || Error::PeriodParse(format!("period out of range: {self}"));
        let (start, end) = match *self {
            Period::Year(y) => (
                NaiveDate::from_ymd_opt(y, 1, 1).ok_or_else(invalid)?,
                NaiveDate::from_ymd_opt(y, 12, 31).ok_or_else(invalid)?,
            ),
            Period::Quarter(y, q) => {
                let start_month = (q as u32 - 1) * 3 + 1;
                (
                    NaiveDate::from_ymd_opt(y, start_month, 1).ok_or_else(invalid)?,
                    last_day_of_month(y, q as u32 * 3),
                )
            }
            Period::Month(y, m) => (
                NaiveDate::from_ymd_opt(y, m as u32, 1).ok_or_else(invalid)?,
                last_day_of_month(y, m as u32),
            ),
            Period::Week(y, w) => {
                let start =
                    NaiveDate::from_isoywd_opt(y, w as u32, Weekday::Mon).ok_or_else(invalid)?;
                (start, start + Duration::days(6))
            }
            Period::Rolling(n, as_of) => (as_of - Duration::days(n as i64 - 1), as_of),
        };
        DateRange::new(start, end)
    }

    /// The previous period of the same type.
    pub fn previous(&self) -> Self {
        match *self {
            Period::Year(y) => Period::Year(y - 1),
            Period::Quarter(y, q) => {
                if q == 1 {
                    Period::Quarter(y - 1, 4)
                } else {
                    Period::Quarter(y, q - 1)
                }
            }
            Period::Month(y, m) => {
                if m == 1 {
                    Period::Month(y - 1, 12)
                } else {
                    Period::Month(y, m - 1)
                }
            }
            Period::Week(y, w) => {
                let prior = NaiveDate::from_isoywd_opt(y, w as u32, Weekday::Mon)
                    .map(|d| (d - Duration::weeks(1)).iso_week());
                match prior {
                    Some(iw) => Period::Week(iw.year(), iw.week() as u8),
                    None => Period::Week(y, w.saturating_sub(1).max(1)),
                }
            }
            Period::Rolling(n, as_of) => Period::Rolling(n, as_of - Duration::days(n as i64)),
        }
    }

    /// Primary range and comparison range (the previous period).
    pub fn ranges(&self) -> Result<(DateRange, DateRange)> {
        Ok((self.date_range()?, self.previous().date_range()?))
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}

fn parse_capture<T: std::str::FromStr>(raw: &str, whole: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::PeriodParse(format!("invalid period: {whole}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_fixed_periods() {
        let today = d(2025, 6, 15);
        assert_eq!(Period::parse_as_of("2025", today).unwrap(), Period::Year(2025));
        assert_eq!(
            Period::parse_as_of("2025-Q4", today).unwrap(),
            Period::Quarter(2025, 4)
        );
        assert_eq!(
            Period::parse_as_of("2025-01", today).unwrap(),
            Period::Month(2025, 1)
        );
        assert_eq!(
            Period::parse_as_of("2025-W5", today).unwrap(),
            Period::Week(2025, 5)
        );
    }

    #[test]
    fn test_parse_relative_periods() {
        let today = d(2025, 3, 10);
        assert_eq!(
            Period::parse_as_of("30d", today).unwrap(),
            Period::Rolling(30, d(2025, 3, 9))
        );
        assert_eq!(
            Period::parse_as_of("last-month", today).unwrap(),
            Period::Month(2025, 2)
        );
        assert_eq!(
            Period::parse_as_of("last-quarter", today).unwrap(),
            Period::Quarter(2024, 4)
        );
        assert_eq!(
            Period::parse_as_of("last-year", today).unwrap(),
            Period::Year(2024)
        );
        // 2025-03-03 is the Monday of ISO week 10
        assert_eq!(
            Period::parse_as_of("last-week", today).unwrap(),
            Period::Week(2025, 10)
        );
    }

    #[test]
    fn test_parse_invalid() {
        let today = d(2025, 3, 10);
        assert!(Period::parse_as_of("garbage", today).is_err());
        assert!(Period::parse_as_of("2025-Q5", today).is_err());
        assert!(Period::parse_as_of("2025-13", today).is_err());
        assert!(Period::parse_as_of("2025-W54", today).is_err());
        assert!(Period::parse_as_of("0d", today).is_err());
    }

    #[test]
    fn test_quarter_ranges() {
        let (primary, comparison) = Period::Quarter(2025, 1).ranges().unwrap();
        assert_eq!(primary.to_token(), "2025-01-01/2025-03-31");
        assert_eq!(comparison.to_token(), "2024-10-01/2024-12-31");
    }

    #[test]
    fn test_month_ranges_cross_year() {
        let (primary, comparison) = Period::Month(2025, 1).ranges().unwrap();
        assert_eq!(primary.to_token(), "2025-01-01/2025-01-31");
        assert_eq!(comparison.to_token(), "2024-12-01/2024-12-31");
    }

    #[test]
    fn test_week_previous_crosses_iso_year() {
        // 2021 has 52 ISO weeks; 2020 has 53
        assert_eq!(Period::Week(2021, 1).previous(), Period::Week(2020, 53));
        let r = Period::Week(2025, 1).date_range().unwrap();
        assert_eq!(r.start.weekday(), Weekday::Mon);
        assert_eq!(r.num_days(), 7);
    }

    #[test]
    fn test_rolling_ranges_are_adjacent() {
        let (primary, comparison) = Period::Rolling(7, d(2025, 3, 9)).ranges().unwrap();
        assert_eq!(primary.to_token(), "2025-03-03/2025-03-09");
        assert_eq!(comparison.to_token(), "2025-02-24/2025-03-02");
    }
}
