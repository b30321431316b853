//! Calendar time windows used to filter aggregation input.
//!
//! A window is anchored to the calendar period surrounding "now" in a fixed
//! offset. Bounds form the closed interval
//! `[period start, next period start - 1ns]`, so an instant exactly at the
//! start of the next period belongs to the next period only.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// The supported leaderboard filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    /// The calendar month containing "now".
    Month,
    /// The calendar year containing "now".
    Year,
    /// No time restriction.
    AllTime,
}

impl TimeWindow {
    /// Closed bounds of the window, or `None` when unbounded.
    pub fn bounds(
        &self,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let local = now.with_timezone(&offset);
        let (start, next) = match self {
            Self::AllTime => return None,
            Self::Month => {
                let start = NaiveDate::from_ymd_opt(local.year(), local.month(), 1)?;
                let next = if local.month() == 12 {
                    NaiveDate::from_ymd_opt(local.year() + 1, 1, 1)?
                } else {
                    NaiveDate::from_ymd_opt(local.year(), local.month() + 1, 1)?
                };
                (start, next)
            }
            Self::Year => (
                NaiveDate::from_ymd_opt(local.year(), 1, 1)?,
                NaiveDate::from_ymd_opt(local.year() + 1, 1, 1)?,
            ),
        };

        let start = offset
            .from_local_datetime(&start.and_hms_opt(0, 0, 0)?)
            .single()?
            .with_timezone(&Utc);
        let next = offset
            .from_local_datetime(&next.and_hms_opt(0, 0, 0)?)
            .single()?
            .with_timezone(&Utc);

        Some((start, next - Duration::nanoseconds(1)))
    }

    /// Whether `instant` falls inside the window anchored at `now`.
    pub fn contains(
        &self,
        instant: DateTime<Utc>,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> bool {
        match self.bounds(now, offset) {
            Some((start, end)) => start <= instant && instant <= end,
            None => true,
        }
    }

    /// Lowercase name used in logs and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Year => "year",
            Self::AllTime => "all_time",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "month" | "this_month" => Ok(Self::Month),
            "year" | "this_year" => Ok(Self::Year),
            "all" | "all_time" | "alltime" => Ok(Self::AllTime),
            _ => Err(AppError::validation(format!(
                "Invalid time window: '{s}'. Expected one of: month, year, all_time"
            ))),
        }
    }
}
