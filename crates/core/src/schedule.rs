//! Daily run schedule.
//!
//! Accepts the daily cron form `MIN HOUR * * *` (UTC). Missed slots are
//! never replayed: the next run is always the first slot strictly after
//! the reference time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::error::Error;

/// Default schedule: every day at 06:00 UTC.
pub const DEFAULT_SCHEDULE: &str = "0 6 * * *";

/// A once-a-day schedule at a fixed UTC time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    hour: u32,
    minute: u32,
}

impl DailySchedule {
    pub fn new(hour: u32, minute: u32) -> Result<Self, Error> {
        if hour > 23 || minute > 59 {
            return Err(Error::schedule(format!(
                "time {:02}:{:02} out of range",
                hour, minute
            )));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// First slot strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN);
        let today = after.date_naive().and_time(time).and_utc();
        if today > after {
            today
        } else {
            today + Duration::days(1)
        }
    }

    /// Time to wait from `now` until the next slot.
    pub fn until_next(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.next_after(now) - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self { hour: 6, minute: 0 }
    }
}

impl FromStr for DailySchedule {
    type Err = Error;

    fn from_str(expression: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(Error::schedule(format!(
                "invalid cron expression '{}' (need 5 fields: MIN HOUR DOM MON DOW)",
                expression
            )));
        }
        if parts[2..].iter().any(|p| *p != "*") {
            return Err(Error::schedule(format!(
                "only daily schedules are supported, got '{}'",
                expression
            )));
        }

        let minute = parts[0]
            .parse::<u32>()
            .map_err(|_| Error::schedule(format!("invalid minute field '{}'", parts[0])))?;
        let hour = parts[1]
            .parse::<u32>()
            .map_err(|_| Error::schedule(format!("invalid hour field '{}'", parts[1])))?;

        Self::new(hour, minute)
    }
}

impl fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} * * *", self.minute, self.hour)
    }
}
