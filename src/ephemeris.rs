//! The ephemeris seam.
//!
//! [`Ephemeris`] is everything the event resolver and the derived quantities
//! need from an astronomy backend. [`Almanac`] implements it on top of the
//! in-process [`solar`](crate::solar) and [`lunar`](crate::lunar) models and
//! normalizes their output: radians become degrees, missing crossings become
//! `valid = false`, and non-finite numbers become [`ComputationError`]s.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ComputationError, ConfigError};
use crate::lunar::{self, MoonDay};
use crate::solar::{self, SolarDay};

/// Observer location, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ConfigError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ConfigError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ConfigError::LongitudeOutOfRange(longitude));
        }
        Ok(Self { latitude, longitude })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.latitude >= 0.0 { 'N' } else { 'S' };
        let ew = if self.longitude >= 0.0 { 'E' } else { 'W' };
        write!(f, "{:.4}°{} {:.4}°{}", self.latitude.abs(), ns, self.longitude.abs(), ew)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Body {
    Sun,
    Moon,
}

/// Topocentric horizontal coordinates, degrees. Azimuth is clockwise from north.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizontalPosition {
    pub azimuth_degrees: f64,
    pub altitude_degrees: f64,
}

/// One named event looked up for one day. `valid = false` means the event
/// does not happen that day at that latitude; `timestamp` is then meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTime {
    pub timestamp: DateTime<Utc>,
    pub valid: bool,
}

impl EventTime {
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, valid: true }
    }

    pub fn absent(placeholder: DateTime<Utc>) -> Self {
        Self { timestamp: placeholder, valid: false }
    }

    fn from_option(found: Option<DateTime<Utc>>, placeholder: DateTime<Utc>) -> Self {
        found.map_or(Self::absent(placeholder), Self::at)
    }
}

pub type EventTimes<E> = BTreeMap<E, EventTime>;

/// A fixed, enumerable family of named events.
pub trait CelestialEvent: Copy + Ord + fmt::Debug + 'static {
    const ALL: &'static [Self];

    /// Label value used in the exposition.
    fn label(&self) -> String;
}

/// Sun and twilight events, in the order they occur through a normal day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SunEvent {
    AstronomicalDawn,
    AmateurDawn,
    NauticalDawn,
    BlueHourDawnStart,
    CivilDawn,
    BlueHourDawnEnd,
    GoldenHourDawnStart,
    SunriseStart,
    SunriseEnd,
    GoldenHourDawnEnd,
    SolarNoon,
    GoldenHourDuskStart,
    SunsetStart,
    SunsetEnd,
    GoldenHourDuskEnd,
    BlueHourDuskStart,
    CivilDusk,
    BlueHourDuskEnd,
    NauticalDusk,
    AmateurDusk,
    AstronomicalDusk,
    Nadir,
}

/// Solar altitude (degrees) paired with the event reached on the way up
/// and the event reached on the way down.
const TWILIGHT: [(f64, SunEvent, SunEvent); 10] = [
    (6.0, SunEvent::GoldenHourDawnEnd, SunEvent::GoldenHourDuskStart),
    (-0.3, SunEvent::SunriseEnd, SunEvent::SunsetStart),
    (solar::HORIZON_ANGLE, SunEvent::SunriseStart, SunEvent::SunsetEnd),
    (-1.0, SunEvent::GoldenHourDawnStart, SunEvent::GoldenHourDuskEnd),
    (-4.0, SunEvent::BlueHourDawnEnd, SunEvent::BlueHourDuskStart),
    (-6.0, SunEvent::CivilDawn, SunEvent::CivilDusk),
    (-8.0, SunEvent::BlueHourDawnStart, SunEvent::BlueHourDuskEnd),
    (-12.0, SunEvent::NauticalDawn, SunEvent::NauticalDusk),
    (-15.0, SunEvent::AmateurDawn, SunEvent::AmateurDusk),
    (-18.0, SunEvent::AstronomicalDawn, SunEvent::AstronomicalDusk),
];

impl SunEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AstronomicalDawn => "astronomicalDawn",
            Self::AmateurDawn => "amateurDawn",
            Self::NauticalDawn => "nauticalDawn",
            Self::BlueHourDawnStart => "blueHourDawnStart",
            Self::CivilDawn => "civilDawn",
            Self::BlueHourDawnEnd => "blueHourDawnEnd",
            Self::GoldenHourDawnStart => "goldenHourDawnStart",
            Self::SunriseStart => "sunriseStart",
            Self::SunriseEnd => "sunriseEnd",
            Self::GoldenHourDawnEnd => "goldenHourDawnEnd",
            Self::SolarNoon => "solarNoon",
            Self::GoldenHourDuskStart => "goldenHourDuskStart",
            Self::SunsetStart => "sunsetStart",
            Self::SunsetEnd => "sunsetEnd",
            Self::GoldenHourDuskEnd => "goldenHourDuskEnd",
            Self::BlueHourDuskStart => "blueHourDuskStart",
            Self::CivilDusk => "civilDusk",
            Self::BlueHourDuskEnd => "blueHourDuskEnd",
            Self::NauticalDusk => "nauticalDusk",
            Self::AmateurDusk => "amateurDusk",
            Self::AstronomicalDusk => "astronomicalDusk",
            Self::Nadir => "nadir",
        }
    }
}

impl CelestialEvent for SunEvent {
    const ALL: &'static [Self] = &[
        Self::AstronomicalDawn,
        Self::AmateurDawn,
        Self::NauticalDawn,
        Self::BlueHourDawnStart,
        Self::CivilDawn,
        Self::BlueHourDawnEnd,
        Self::GoldenHourDawnStart,
        Self::SunriseStart,
        Self::SunriseEnd,
        Self::GoldenHourDawnEnd,
        Self::SolarNoon,
        Self::GoldenHourDuskStart,
        Self::SunsetStart,
        Self::SunsetEnd,
        Self::GoldenHourDuskEnd,
        Self::BlueHourDuskStart,
        Self::CivilDusk,
        Self::BlueHourDuskEnd,
        Self::NauticalDusk,
        Self::AmateurDusk,
        Self::AstronomicalDusk,
        Self::Nadir,
    ];

    fn label(&self) -> String {
        self.name().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MoonEvent {
    Rise,
    Highest,
    Set,
}

impl MoonEvent {
    /// Backend name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rise => "rise",
            Self::Highest => "highest",
            Self::Set => "set",
        }
    }
}

impl CelestialEvent for MoonEvent {
    const ALL: &'static [Self] = &[Self::Rise, Self::Highest, Self::Set];

    fn label(&self) -> String {
        camel_prefixed("moon", self.name())
    }
}

/// `("moon", "rise")` → `"moonRise"`.
pub fn camel_prefixed(prefix: &str, name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => {
            let mut out = String::with_capacity(prefix.len() + name.len());
            out.push_str(prefix);
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
            out
        }
        None => prefix.to_string(),
    }
}

/// Lunar illumination at one instant, with the upcoming principal phases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoonIllumination {
    pub fraction: f64,
    pub phase: f64,
    pub angle_degrees: f64,
    pub next_new_moon: DateTime<Utc>,
    pub next_full_moon: DateTime<Utc>,
}

/// Astronomy backend contract.
///
/// Event lookups read only the UTC calendar date of `day`: callers pass a
/// local civil date re-expressed as UTC wall-clock (see [`crate::calendar`]).
pub trait Ephemeris {
    fn position(
        &self,
        body: Body,
        at: DateTime<Utc>,
        coordinate: Coordinate,
    ) -> Result<HorizontalPosition, ComputationError>;

    fn sun_events(
        &self,
        day: DateTime<Utc>,
        coordinate: Coordinate,
    ) -> Result<EventTimes<SunEvent>, ComputationError>;

    fn moon_events(
        &self,
        day: DateTime<Utc>,
        coordinate: Coordinate,
    ) -> Result<EventTimes<MoonEvent>, ComputationError>;

    fn moon_distance_km(&self, at: DateTime<Utc>, coordinate: Coordinate) -> Result<f64, ComputationError>;

    fn moon_parallactic_angle_degrees(
        &self,
        at: DateTime<Utc>,
        coordinate: Coordinate,
    ) -> Result<f64, ComputationError>;

    fn moon_illumination(
        &self,
        at: DateTime<Utc>,
        coordinate: Coordinate,
    ) -> Result<MoonIllumination, ComputationError>;
}

/// The in-process backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct Almanac;

fn finite(value: f64, quantity: &'static str) -> Result<f64, ComputationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ComputationError::NonFinite { quantity })
    }
}

impl Ephemeris for Almanac {
    fn position(
        &self,
        body: Body,
        at: DateTime<Utc>,
        coordinate: Coordinate,
    ) -> Result<HorizontalPosition, ComputationError> {
        let Coordinate { latitude, longitude } = coordinate;
        let (azimuth, altitude) = match body {
            Body::Sun => {
                let pos = solar::solar_position(&at, latitude, longitude);
                (pos.azimuth, pos.altitude)
            }
            Body::Moon => {
                let pos = lunar::lunar_position(&at, latitude, longitude);
                (pos.azimuth, pos.altitude)
            }
        };
        Ok(HorizontalPosition {
            azimuth_degrees: finite(azimuth, "azimuth")?,
            altitude_degrees: finite(altitude, "altitude")?,
        })
    }

    fn sun_events(
        &self,
        day: DateTime<Utc>,
        coordinate: Coordinate,
    ) -> Result<EventTimes<SunEvent>, ComputationError> {
        let solar_day = SolarDay::scan(day.date_naive(), coordinate.latitude, coordinate.longitude)
            .ok_or(ComputationError::NonFinite { quantity: "solar noon" })?;

        let mut events = EventTimes::new();
        for (angle, dawn, dusk) in TWILIGHT {
            events.insert(dawn, EventTime::from_option(solar_day.dawn(angle), day));
            events.insert(dusk, EventTime::from_option(solar_day.dusk(angle), day));
        }
        events.insert(SunEvent::SolarNoon, EventTime::at(solar_day.solar_noon()));
        events.insert(SunEvent::Nadir, EventTime::from_option(solar_day.nadir(), day));
        Ok(events)
    }

    fn moon_events(
        &self,
        day: DateTime<Utc>,
        coordinate: Coordinate,
    ) -> Result<EventTimes<MoonEvent>, ComputationError> {
        let moon = MoonDay::scan(day.date_naive(), coordinate.latitude, coordinate.longitude);
        Ok(EventTimes::from([
            (MoonEvent::Rise, EventTime::from_option(moon.rise, day)),
            (MoonEvent::Highest, EventTime::from_option(moon.highest, day)),
            (MoonEvent::Set, EventTime::from_option(moon.set, day)),
        ]))
    }

    fn moon_distance_km(&self, at: DateTime<Utc>, coordinate: Coordinate) -> Result<f64, ComputationError> {
        let pos = lunar::lunar_position(&at, coordinate.latitude, coordinate.longitude);
        finite(pos.distance_km, "moon distance")
    }

    fn moon_parallactic_angle_degrees(
        &self,
        at: DateTime<Utc>,
        coordinate: Coordinate,
    ) -> Result<f64, ComputationError> {
        let pos = lunar::lunar_position(&at, coordinate.latitude, coordinate.longitude);
        finite(pos.parallactic_angle.to_degrees(), "parallactic angle")
    }

    fn moon_illumination(
        &self,
        at: DateTime<Utc>,
        _coordinate: Coordinate,
    ) -> Result<MoonIllumination, ComputationError> {
        let illum = lunar::illumination(&at);
        let next_new_moon = lunar::next_phase(&at, lunar::NEW_MOON)
            .ok_or(ComputationError::TimeOutOfRange { context: "next new moon" })?;
        let next_full_moon = lunar::next_phase(&at, lunar::FULL_MOON)
            .ok_or(ComputationError::TimeOutOfRange { context: "next full moon" })?;

        Ok(MoonIllumination {
            fraction: finite(illum.fraction, "illumination fraction")?,
            phase: finite(illum.phase, "illumination phase")?,
            angle_degrees: finite(illum.angle.to_degrees(), "illumination angle")?,
            next_new_moon,
            next_full_moon,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LONDON: Coordinate = Coordinate { latitude: 51.5, longitude: -0.12 };
    const SVALBARD: Coordinate = Coordinate { latitude: 78.2232, longitude: 15.6267 };

    #[test]
    fn test_sun_event_labels() {
        let labels: Vec<String> = SunEvent::ALL.iter().map(|e| e.label()).collect();
        assert_eq!(labels.len(), 22);
        assert_eq!(labels.first().map(String::as_str), Some("astronomicalDawn"));
        assert_eq!(labels.last().map(String::as_str), Some("nadir"));
        assert!(labels.contains(&"blueHourDuskStart".to_string()));
    }

    #[test]
    fn test_moon_event_labels_are_camel_cased() {
        let labels: Vec<String> = MoonEvent::ALL.iter().map(|e| e.label()).collect();
        assert_eq!(labels, ["moonRise", "moonHighest", "moonSet"]);
        assert_eq!(camel_prefixed("moon", ""), "moon");
    }

    #[test]
    fn test_twilight_table_covers_every_sun_event() {
        let mut named: Vec<SunEvent> = TWILIGHT.iter().flat_map(|(_, a, b)| [*a, *b]).collect();
        named.extend([SunEvent::SolarNoon, SunEvent::Nadir]);
        named.sort();
        assert_eq!(named, SunEvent::ALL);
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(51.5, -0.12).is_ok());
        assert_eq!(Coordinate::new(90.5, 0.0), Err(ConfigError::LatitudeOutOfRange(90.5)));
        assert_eq!(Coordinate::new(0.0, -181.0), Err(ConfigError::LongitudeOutOfRange(-181.0)));
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_almanac_sun_events_london() {
        let day = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let events = Almanac.sun_events(day, LONDON).unwrap();
        assert_eq!(events.len(), SunEvent::ALL.len());
        assert!(events.values().all(|e| e.valid), "every event happens in a London winter");

        let ordered: Vec<_> = SunEvent::ALL
            .iter()
            .filter(|e| **e != SunEvent::Nadir)
            .map(|e| events[e].timestamp)
            .collect();
        assert!(ordered.windows(2).all(|w| w[0] <= w[1]), "events out of order");
    }

    #[test]
    fn test_almanac_midnight_sun_flags_missing_events() {
        let day = Utc.with_ymd_and_hms(2024, 6, 21, 0, 0, 0).unwrap();
        let events = Almanac.sun_events(day, SVALBARD).unwrap();
        assert!(!events[&SunEvent::SunriseStart].valid);
        assert!(!events[&SunEvent::SunsetStart].valid);
        assert!(!events[&SunEvent::CivilDusk].valid);
        assert!(events[&SunEvent::SolarNoon].valid);
        assert!(events[&SunEvent::Nadir].valid);
    }

    #[test]
    fn test_almanac_moon_events_keys() {
        let day = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let events = Almanac.moon_events(day, LONDON).unwrap();
        assert_eq!(events.keys().copied().collect::<Vec<_>>(), MoonEvent::ALL);
    }

    #[test]
    fn test_almanac_illumination_is_normalized() {
        let at = Utc.with_ymd_and_hms(2024, 1, 18, 3, 52, 0).unwrap();
        let illum = Almanac.moon_illumination(at, LONDON).unwrap();
        assert!((0.0..=1.0).contains(&illum.fraction));
        assert!((0.0..1.0).contains(&illum.phase));
        assert!(illum.angle_degrees.abs() <= 180.0 && illum.angle_degrees.abs() > 3.2, "degrees, not radians");
        assert!(illum.next_new_moon > at && illum.next_full_moon > at);
        assert!(illum.next_full_moon < illum.next_new_moon, "first quarter: full moon comes first");
    }

    #[test]
    fn test_almanac_positions_in_range() {
        let at = Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap();
        for body in [Body::Sun, Body::Moon] {
            let pos = Almanac.position(body, at, LONDON).unwrap();
            assert!((0.0..360.0).contains(&pos.azimuth_degrees));
            assert!((-90.0..=90.0).contains(&pos.altitude_degrees));
        }
        let q = Almanac.moon_parallactic_angle_degrees(at, LONDON).unwrap();
        assert!(q.abs() <= 180.0);
        let d = Almanac.moon_distance_km(at, LONDON).unwrap();
        assert!(d > 350_000.0 && d < 410_000.0);
    }

    #[test]
    fn test_almanac_rejects_non_finite_output() {
        let broken = Coordinate { latitude: f64::NAN, longitude: 0.0 };
        let at = Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap();
        assert!(matches!(
            Almanac.position(Body::Sun, at, broken),
            Err(ComputationError::NonFinite { .. })
        ));
    }
}
