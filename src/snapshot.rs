//! One scrape's worth of observations.
//!
//! [`SnapshotBuilder::build`] runs every computation for a single frozen
//! `now` and projects the results onto the metric catalog. Sections fail
//! independently: a [`ComputationError`] drops that section's observations
//! and is recorded in [`Snapshot::failures`], the rest are still emitted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use crate::calendar::Zone;
use crate::derived;
use crate::ephemeris::{Body, CelestialEvent, Coordinate, Ephemeris};
use crate::error::ComputationError;
use crate::resolver::{seconds_until, EventResolver, ResolvedEvent};

/// Every gauge the exporter publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Metric {
    #[serde(rename = "sun_position_azimuth_degrees")]
    SunAzimuth,
    #[serde(rename = "sun_position_altitude_degrees")]
    SunAltitude,
    #[serde(rename = "sun_event_time_seconds")]
    SunEventTime,
    #[serde(rename = "moon_position_azimuth_degrees")]
    MoonAzimuth,
    #[serde(rename = "moon_position_altitude_degrees")]
    MoonAltitude,
    #[serde(rename = "moon_position_distance_kilometers")]
    MoonDistance,
    #[serde(rename = "moon_position_parallacticangle_degrees")]
    MoonParallacticAngle,
    #[serde(rename = "moon_event_time_seconds")]
    MoonEventTime,
    #[serde(rename = "moon_illumination_fraction")]
    IlluminationFraction,
    #[serde(rename = "moon_illumination_phase")]
    IlluminationPhase,
    #[serde(rename = "moon_illumination_angle_degrees")]
    IlluminationAngle,
    #[serde(rename = "moon_illumination_zenith_angle_degrees")]
    IlluminationZenithAngle,
}

impl Metric {
    pub const ALL: [Metric; 12] = [
        Metric::SunAzimuth,
        Metric::SunAltitude,
        Metric::SunEventTime,
        Metric::MoonAzimuth,
        Metric::MoonAltitude,
        Metric::MoonDistance,
        Metric::MoonParallacticAngle,
        Metric::MoonEventTime,
        Metric::IlluminationFraction,
        Metric::IlluminationPhase,
        Metric::IlluminationAngle,
        Metric::IlluminationZenithAngle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::SunAzimuth => "sun_position_azimuth_degrees",
            Self::SunAltitude => "sun_position_altitude_degrees",
            Self::SunEventTime => "sun_event_time_seconds",
            Self::MoonAzimuth => "moon_position_azimuth_degrees",
            Self::MoonAltitude => "moon_position_altitude_degrees",
            Self::MoonDistance => "moon_position_distance_kilometers",
            Self::MoonParallacticAngle => "moon_position_parallacticangle_degrees",
            Self::MoonEventTime => "moon_event_time_seconds",
            Self::IlluminationFraction => "moon_illumination_fraction",
            Self::IlluminationPhase => "moon_illumination_phase",
            Self::IlluminationAngle => "moon_illumination_angle_degrees",
            Self::IlluminationZenithAngle => "moon_illumination_zenith_angle_degrees",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            Self::SunAzimuth => "Azimuth of the sun at current location, in degrees",
            Self::SunAltitude => "Altitude of the sun at current location, in degrees",
            Self::SunEventTime | Self::MoonEventTime => "Time, in seconds until event",
            Self::MoonAzimuth => "Azimuth of the moon at current location, in degrees",
            Self::MoonAltitude => "Altitude of the moon at current location, in degrees",
            Self::MoonDistance => "Distance to the moon at current location, in kilometers",
            Self::MoonParallacticAngle => "Parallactic Angle to the moon at current location, in degrees",
            Self::IlluminationFraction => "Illuminated fraction of the moon, 0 (new) to 1 (full)",
            Self::IlluminationPhase => "Moon phase, 0 new, 0.25 first quarter, 0.5 full, 0.75 last quarter",
            Self::IlluminationAngle => "Midpoint angle of the moon's illuminated limb, in degrees",
            Self::IlluminationZenithAngle => {
                "Angle of the moon's illuminated limb from the zenith at current location, in degrees"
            }
        }
    }

    /// Name of the single label this metric carries, if any.
    pub fn label_key(&self) -> Option<&'static str> {
        match self {
            Self::SunEventTime => Some("sun_event"),
            Self::MoonEventTime => Some("moon_event"),
            _ => None,
        }
    }

    /// Decimal places kept at the projection boundary; `None` keeps full precision.
    pub fn precision(&self) -> Option<u32> {
        match self {
            Self::SunEventTime | Self::MoonEventTime | Self::MoonDistance => Some(0),
            Self::IlluminationFraction | Self::IlluminationPhase => None,
            _ => Some(2),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Labels for the extra moon-event values that do not come from the event scan.
pub const NEXT_NEW_MOON: &str = "nextNewMoon";
pub const NEXT_FULL_MOON: &str = "nextFullMoon";
pub const MOON_AGE: &str = "moonAge";

/// One gauge value, already rounded for exposition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub metric: Metric,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

impl Observation {
    pub fn new(metric: Metric, value: f64) -> Self {
        Self::with_labels(metric, BTreeMap::new(), value)
    }

    /// Observation of a labeled metric. Unlabeled metrics ignore `label_value`.
    pub fn labeled(metric: Metric, label_value: impl Into<String>, value: f64) -> Self {
        let labels = metric
            .label_key()
            .map(|key| BTreeMap::from([(key.to_string(), label_value.into())]))
            .unwrap_or_default();
        Self::with_labels(metric, labels, value)
    }

    fn with_labels(metric: Metric, labels: BTreeMap<String, String>, value: f64) -> Self {
        let value = match metric.precision() {
            Some(decimals) => round_to(value, decimals),
            None => value,
        };
        Self { metric, labels, value }
    }

    /// The label value, for labeled metrics.
    pub fn label(&self) -> Option<&str> {
        let key = self.metric.label_key()?;
        self.labels.get(key).map(String::as_str)
    }
}

/// Independent parts of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    SunPosition,
    SunEvents,
    MoonPosition,
    MoonEvents,
    Illumination,
    MoonAge,
    ZenithAngle,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SunPosition => "sun position",
            Self::SunEvents => "sun events",
            Self::MoonPosition => "moon position",
            Self::MoonEvents => "moon events",
            Self::Illumination => "illumination",
            Self::MoonAge => "moon age",
            Self::ZenithAngle => "zenith angle",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionFailure {
    pub section: Section,
    pub error: ComputationError,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub coordinate: Coordinate,
    pub observations: Vec<Observation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SectionFailure>,
}

impl Snapshot {
    fn new(taken_at: DateTime<Utc>, coordinate: Coordinate) -> Self {
        Self { taken_at, coordinate, observations: Vec::new(), failures: Vec::new() }
    }

    /// Value of one observation, matched by metric and label value.
    pub fn get(&self, metric: Metric, label: Option<&str>) -> Option<f64> {
        self.observations
            .iter()
            .find(|o| o.metric == metric && o.label() == label)
            .map(|o| o.value)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn section<F>(&mut self, section: Section, compute: F)
    where
        F: FnOnce() -> Result<Vec<Observation>, ComputationError>,
    {
        match compute() {
            Ok(observations) => self.observations.extend(observations),
            Err(error) => {
                warn!(%section, %error, "computation failed, section omitted from this scrape");
                self.failures.push(SectionFailure { section, error });
            }
        }
    }
}

/// Computes snapshots for one fixed location.
pub struct SnapshotBuilder<P> {
    provider: P,
    coordinate: Coordinate,
    zone: Zone,
}

impl<P: Ephemeris> SnapshotBuilder<P> {
    pub fn new(provider: P, coordinate: Coordinate, zone: Zone) -> Self {
        Self { provider, coordinate, zone }
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn build(&self, now: DateTime<Utc>) -> Snapshot {
        let provider = &self.provider;
        let coordinate = self.coordinate;
        let resolver = EventResolver::new(provider, coordinate, self.zone);
        let mut snapshot = Snapshot::new(now, coordinate);

        snapshot.section(Section::SunPosition, || {
            let sun = provider.position(Body::Sun, now, coordinate)?;
            Ok(vec![
                Observation::new(Metric::SunAzimuth, sun.azimuth_degrees),
                Observation::new(Metric::SunAltitude, sun.altitude_degrees),
            ])
        });

        snapshot.section(Section::SunEvents, || {
            Ok(event_observations(Metric::SunEventTime, resolver.sun_events(now)?))
        });

        // Shared by the moon position and zenith angle sections.
        let parallactic = provider.moon_parallactic_angle_degrees(now, coordinate);

        snapshot.section(Section::MoonPosition, || {
            let moon = provider.position(Body::Moon, now, coordinate)?;
            let distance = provider.moon_distance_km(now, coordinate)?;
            Ok(vec![
                Observation::new(Metric::MoonAzimuth, moon.azimuth_degrees),
                Observation::new(Metric::MoonAltitude, moon.altitude_degrees),
                Observation::new(Metric::MoonDistance, distance),
                Observation::new(Metric::MoonParallacticAngle, parallactic.clone()?),
            ])
        });

        snapshot.section(Section::MoonEvents, || {
            Ok(event_observations(Metric::MoonEventTime, resolver.moon_events(now)?))
        });

        let illumination = provider.moon_illumination(now, coordinate);

        snapshot.section(Section::Illumination, || {
            let illum = illumination.clone()?;
            Ok(vec![
                Observation::new(Metric::IlluminationFraction, illum.fraction),
                Observation::new(Metric::IlluminationPhase, illum.phase),
                Observation::new(Metric::IlluminationAngle, illum.angle_degrees),
                Observation::labeled(Metric::MoonEventTime, NEXT_NEW_MOON, seconds_until(illum.next_new_moon, now)),
                Observation::labeled(
                    Metric::MoonEventTime,
                    NEXT_FULL_MOON,
                    seconds_until(illum.next_full_moon, now),
                ),
            ])
        });

        snapshot.section(Section::MoonAge, || {
            let age = derived::moon_age(provider, coordinate, now, &illumination.clone()?)?;
            Ok(vec![Observation::labeled(Metric::MoonEventTime, MOON_AGE, age)])
        });

        snapshot.section(Section::ZenithAngle, || {
            let zenith = derived::zenith_angle(parallactic.clone()?, illumination.clone()?.angle_degrees);
            Ok(vec![Observation::new(Metric::IlluminationZenithAngle, zenith)])
        });

        snapshot
    }
}

fn event_observations<E: CelestialEvent>(metric: Metric, resolved: Vec<ResolvedEvent<E>>) -> Vec<Observation> {
    resolved
        .into_iter()
        .map(|r| Observation::labeled(metric, r.event.label(), r.seconds_until))
        .collect()
}
