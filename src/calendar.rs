//! Local civil calendar.
//!
//! The ephemeris reads the UTC calendar date of the instants it is given, so
//! the resolver hands it local civil dates re-expressed as UTC wall-clock
//! values. Getting the shift wrong moves every event by up to a day near
//! midnight.

use chrono::{DateTime, Duration, Local, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt;

use crate::error::{ComputationError, ConfigError};

/// Timezone whose civil calendar decides when "tomorrow" starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// The process's local timezone.
    System,
    Named(Tz),
}

impl Zone {
    /// `None` selects the system timezone.
    pub fn parse(name: Option<&str>) -> Result<Self, ConfigError> {
        match name {
            None => Ok(Self::System),
            Some(name) => name
                .parse::<Tz>()
                .map(Self::Named)
                .map_err(|_| ConfigError::UnknownTimezone(name.to_string())),
        }
    }

    /// Local wall-clock reading of `now`, re-expressed as if it were UTC.
    pub fn wall_clock(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::System => wall_clock_in(&Local, now),
            Self::Named(tz) => wall_clock_in(tz, now),
        }
    }

    /// Local civil midnight starting the day after `now`, shifted by its UTC
    /// offset so that its UTC date is the local date of tomorrow.
    pub fn next_day_boundary(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ComputationError> {
        match self {
            Self::System => next_day_boundary_in(&Local, now),
            Self::Named(tz) => next_day_boundary_in(tz, now),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system local time"),
            Self::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

fn wall_clock_in<Z: TimeZone>(zone: &Z, now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_timezone(zone).naive_local().and_utc()
}

fn next_day_boundary_in<Z: TimeZone>(zone: &Z, now: DateTime<Utc>) -> Result<DateTime<Utc>, ComputationError> {
    let out_of_range = ComputationError::TimeOutOfRange { context: "day boundary" };

    let tomorrow = now
        .with_timezone(zone)
        .date_naive()
        .succ_opt()
        .ok_or(out_of_range.clone())?;
    let midnight = tomorrow.and_time(NaiveTime::MIN);

    match zone.from_local_datetime(&midnight).earliest() {
        Some(start) => {
            let offset = start.offset().fix().local_minus_utc();
            start
                .with_timezone(&Utc)
                .checked_add_signed(Duration::seconds(i64::from(offset)))
                .ok_or(out_of_range)
        }
        // Midnight skipped by a DST transition.
        None => Ok(midnight.and_utc()),
    }
}
