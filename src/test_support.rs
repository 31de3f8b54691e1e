//! Scripted ephemeris for unit tests.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::collections::HashMap;

use crate::ephemeris::{
    Body, Coordinate, Ephemeris, EventTimes, HorizontalPosition, MoonEvent, MoonIllumination, SunEvent,
};
use crate::error::ComputationError;

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

/// Illumination with the given fraction and next new moon; the full moon is
/// half a cycle before the new moon.
pub fn illumination(fraction: f64, next_new_moon: DateTime<Utc>) -> MoonIllumination {
    MoonIllumination {
        fraction,
        phase: fraction / 2.0,
        angle_degrees: 0.0,
        next_new_moon,
        next_full_moon: next_new_moon - Duration::hours(354),
    }
}

/// Answers only what a test scripted. Event tables are keyed by the UTC date
/// of the queried day, illuminations by exact instant. Anything else fails.
#[derive(Debug, Default)]
pub struct StubEphemeris {
    pub sun: Option<HorizontalPosition>,
    pub moon: Option<HorizontalPosition>,
    pub sun_days: HashMap<NaiveDate, EventTimes<SunEvent>>,
    pub moon_days: HashMap<NaiveDate, EventTimes<MoonEvent>>,
    pub moon_distance_km: Option<f64>,
    pub parallactic_degrees: Option<f64>,
    pub illuminations: HashMap<DateTime<Utc>, MoonIllumination>,
}

fn unscripted() -> ComputationError {
    ComputationError::NonFinite { quantity: "unscripted value" }
}

impl Ephemeris for StubEphemeris {
    fn position(
        &self,
        body: Body,
        _at: DateTime<Utc>,
        _coordinate: Coordinate,
    ) -> Result<HorizontalPosition, ComputationError> {
        match body {
            Body::Sun => self.sun,
            Body::Moon => self.moon,
        }
        .ok_or_else(unscripted)
    }

    fn sun_events(&self, day: DateTime<Utc>, _coordinate: Coordinate) -> Result<EventTimes<SunEvent>, ComputationError> {
        self.sun_days.get(&day.date_naive()).cloned().ok_or_else(unscripted)
    }

    fn moon_events(
        &self,
        day: DateTime<Utc>,
        _coordinate: Coordinate,
    ) -> Result<EventTimes<MoonEvent>, ComputationError> {
        self.moon_days.get(&day.date_naive()).cloned().ok_or_else(unscripted)
    }

    fn moon_distance_km(&self, _at: DateTime<Utc>, _coordinate: Coordinate) -> Result<f64, ComputationError> {
        self.moon_distance_km.ok_or_else(unscripted)
    }

    fn moon_parallactic_angle_degrees(
        &self,
        _at: DateTime<Utc>,
        _coordinate: Coordinate,
    ) -> Result<f64, ComputationError> {
        self.parallactic_degrees.ok_or_else(unscripted)
    }

    fn moon_illumination(
        &self,
        at: DateTime<Utc>,
        _coordinate: Coordinate,
    ) -> Result<MoonIllumination, ComputationError> {
        self.illuminations.get(&at).copied().ok_or_else(unscripted)
    }
}
