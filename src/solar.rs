//! Solar position calculator based on simplified SPA (Solar Position Algorithm).
//!
//! Computes altitude and azimuth for any instant, latitude, and longitude,
//! and scans one solar day for twilight crossings, solar noon and nadir.
//! Accuracy: ~0.01° for dates within ±50 years of J2000.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use std::f64::consts::PI;

const DEG: f64 = PI / 180.0;

/// Refraction-adjusted horizon angle (sunrise/sunset).
pub const HORIZON_ANGLE: f64 = -0.833;

const SCAN_RESOLUTION_SECONDS: i64 = 60;
const HOUR: f64 = 3600.0;

/// Solar position at a specific instant.
#[derive(Debug, Clone, Copy)]
pub struct SolarPosition {
    pub altitude: f64,
    /// Degrees clockwise from north, [0, 360).
    pub azimuth: f64,
    pub declination: f64,
    pub equation_of_time: f64,
}

/// A timestamped altitude sample from a day scan.
#[derive(Debug, Clone, Copy)]
pub struct AltitudeSample {
    /// Seconds since the start of the scan.
    pub seconds: f64,
    pub altitude: f64,
}

/// Convert a UTC instant to Julian Date.
pub fn julian_date(at: &DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 86_400_000.0 + 2_440_587.5
}

pub(crate) fn julian_century(jd: f64) -> f64 {
    (jd - 2451545.0) / 36525.0
}

pub(crate) fn normalize_degrees(deg: f64) -> f64 {
    let mut d = deg % 360.0;
    if d < 0.0 {
        d += 360.0;
    }
    d
}

fn sun_mean_longitude(t: f64) -> f64 {
    normalize_degrees(280.46646 + t * (36000.76983 + t * 0.0003032))
}

fn sun_mean_anomaly(t: f64) -> f64 {
    normalize_degrees(357.52911 + t * (35999.05029 - t * 0.0001537))
}

fn earth_eccentricity(t: f64) -> f64 {
    0.016708634 - t * (0.000042037 + t * 0.0000001267)
}

fn sun_equation_of_center(t: f64) -> f64 {
    let m = sun_mean_anomaly(t) * DEG;
    m.sin() * (1.914602 - t * (0.004817 + t * 0.000014))
        + (2.0 * m).sin() * (0.019993 - t * 0.000101)
        + (3.0 * m).sin() * 0.000289
}

fn sun_true_longitude(t: f64) -> f64 {
    sun_mean_longitude(t) + sun_equation_of_center(t)
}

pub(crate) fn sun_apparent_longitude(t: f64) -> f64 {
    let omega = 125.04 - 1934.136 * t;
    sun_true_longitude(t) - 0.00569 - 0.00478 * (omega * DEG).sin()
}

fn mean_obliquity(t: f64) -> f64 {
    23.0 + (26.0 + (21.448 - t * (46.815 + t * (0.00059 - t * 0.001813))) / 60.0) / 60.0
}

pub(crate) fn obliquity_corrected(t: f64) -> f64 {
    let omega = 125.04 - 1934.136 * t;
    mean_obliquity(t) + 0.00256 * (omega * DEG).cos()
}

fn solar_declination(t: f64) -> f64 {
    let e = obliquity_corrected(t) * DEG;
    let lambda = sun_apparent_longitude(t) * DEG;
    (e.sin() * lambda.sin()).asin() / DEG
}

fn equation_of_time(t: f64) -> f64 {
    let e = obliquity_corrected(t) * DEG;
    let l0 = sun_mean_longitude(t) * DEG;
    let ecc = earth_eccentricity(t);
    let m = sun_mean_anomaly(t) * DEG;

    let y = (e / 2.0).tan().powi(2);

    let eq = y * (2.0 * l0).sin() - 2.0 * ecc * m.sin()
        + 4.0 * ecc * y * m.sin() * (2.0 * l0).cos()
        - 0.5 * y * y * (4.0 * l0).sin()
        - 1.25 * ecc * ecc * (2.0 * m).sin();

    4.0 * eq / DEG
}

/// Apparent ecliptic longitude of the Sun in degrees.
pub fn sun_ecliptic_longitude(at: &DateTime<Utc>) -> f64 {
    let t = julian_century(julian_date(at));
    normalize_degrees(sun_apparent_longitude(t))
}

/// Geocentric right ascension and declination of the Sun.
/// Returns (right_ascension_deg, declination_deg).
pub fn sun_equatorial(at: &DateTime<Utc>) -> (f64, f64) {
    let t = julian_century(julian_date(at));
    let e = obliquity_corrected(t) * DEG;
    let lambda = sun_apparent_longitude(t) * DEG;

    let ra = normalize_degrees((e.cos() * lambda.sin()).atan2(lambda.cos()) / DEG);
    let dec = (e.sin() * lambda.sin()).asin() / DEG;
    (ra, dec)
}

/// Compute the solar position for a UTC instant, latitude, and longitude.
pub fn solar_position(at: &DateTime<Utc>, lat: f64, lon: f64) -> SolarPosition {
    let jd = julian_date(at);
    let t = julian_century(jd);

    let decl = solar_declination(t);
    let eqt = equation_of_time(t);

    let hour = (at.num_seconds_from_midnight() as f64 + at.nanosecond() as f64 / 1e9) / HOUR;
    let solar_time = hour * 60.0 + eqt + 4.0 * lon;
    let hour_angle = solar_time / 4.0 - 180.0;

    let lat_r = lat * DEG;
    let decl_r = decl * DEG;
    let ha_r = hour_angle * DEG;

    let sin_alt = lat_r.sin() * decl_r.sin() + lat_r.cos() * decl_r.cos() * ha_r.cos();
    let alt_r = sin_alt.asin();
    let altitude = alt_r / DEG;

    let mut azimuth = if lat_r.cos().abs() > 1e-10 {
        let cos_az = (decl_r.sin() - alt_r.sin() * lat_r.sin()) / (alt_r.cos() * lat_r.cos());
        let az = cos_az.clamp(-1.0, 1.0).acos() / DEG;
        if normalize_degrees(hour_angle) < 180.0 { 360.0 - az } else { az }
    } else if lat > 0.0 {
        180.0
    } else {
        0.0
    };
    azimuth = normalize_degrees(azimuth);

    SolarPosition { altitude, azimuth, declination: decl, equation_of_time: eqt }
}

/// Sample the solar altitude from `origin` for `span_seconds`.
pub fn altitude_scan(
    origin: DateTime<Utc>,
    span_seconds: i64,
    resolution_seconds: i64,
    lat: f64,
    lon: f64,
) -> Vec<AltitudeSample> {
    let mut samples = Vec::with_capacity((span_seconds / resolution_seconds + 1) as usize);
    let mut sec = 0i64;
    while sec <= span_seconds {
        let at = origin + Duration::seconds(sec);
        let pos = solar_position(&at, lat, lon);
        samples.push(AltitudeSample { seconds: sec as f64, altitude: pos.altitude });
        sec += resolution_seconds;
    }
    samples
}

/// Seconds of the highest point, refined between neighbouring samples.
pub fn find_peak(samples: &[AltitudeSample]) -> Option<f64> {
    let (idx, _) = samples
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.altitude.total_cmp(&b.altitude))?;
    Some(refine_extremum(samples, idx))
}

/// Seconds of the lowest point, refined between neighbouring samples.
pub fn find_nadir(samples: &[AltitudeSample]) -> Option<f64> {
    let (idx, _) = samples
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.altitude.total_cmp(&b.altitude))?;
    Some(refine_extremum(samples, idx))
}

/// Parabolic vertex through the sample at `idx` and its neighbours.
fn refine_extremum(samples: &[AltitudeSample], idx: usize) -> f64 {
    if idx == 0 || idx + 1 >= samples.len() {
        return samples[idx].seconds;
    }
    let (y0, y1, y2) = (samples[idx - 1].altitude, samples[idx].altitude, samples[idx + 1].altitude);
    let denom = y0 - 2.0 * y1 + y2;
    if denom.abs() < 1e-12 {
        return samples[idx].seconds;
    }
    let step = samples[idx + 1].seconds - samples[idx].seconds;
    samples[idx].seconds + 0.5 * (y0 - y2) / denom * step
}

/// Find the first crossing of a target altitude (ascending or descending).
/// Returns interpolated seconds, or None if no crossing occurs.
pub fn find_crossing(samples: &[AltitudeSample], target: f64, ascending: bool) -> Option<f64> {
    for window in samples.windows(2) {
        let (a, b) = (window[0], window[1]);
        let crosses = if ascending {
            a.altitude <= target && b.altitude > target
        } else {
            a.altitude >= target && b.altitude < target
        };
        if crosses {
            let frac = (target - a.altitude) / (b.altitude - a.altitude);
            return Some(a.seconds + frac * (b.seconds - a.seconds));
        }
    }
    None
}

/// The altitude curve of one solar day.
///
/// The day of `date` is the 24 h centred on that date's solar noon at the
/// observer's longitude. Dawn events are searched in the half before noon,
/// dusk events in the half after it; the nadir is the lower culmination that
/// follows noon.
#[derive(Debug, Clone)]
pub struct SolarDay {
    origin: DateTime<Utc>,
    samples: Vec<AltitudeSample>,
    noon: f64,
}

impl SolarDay {
    pub fn scan(date: NaiveDate, lat: f64, lon: f64) -> Option<Self> {
        let nominal_transit = date.and_time(NaiveTime::MIN).and_utc() + Duration::hours(12)
            - Duration::milliseconds((lon * 240_000.0).round() as i64);
        let origin = nominal_transit - Duration::hours(13);
        let samples = altitude_scan(origin, 27 * 3600, SCAN_RESOLUTION_SECONDS, lat, lon);

        // Equation of time keeps true noon within ±17 min of the nominal transit.
        let noon = find_peak(Self::between(&samples, 12.0 * HOUR, 14.0 * HOUR))?;
        if !noon.is_finite() {
            return None;
        }
        Some(Self { origin, samples, noon })
    }

    pub fn solar_noon(&self) -> DateTime<Utc> {
        self.at(self.noon)
    }

    pub fn nadir(&self) -> Option<DateTime<Utc>> {
        let slice = Self::between(&self.samples, self.noon + 11.0 * HOUR, self.noon + 13.0 * HOUR);
        find_nadir(slice).map(|s| self.at(s))
    }

    /// Ascending crossing of `angle` before solar noon.
    pub fn dawn(&self, angle: f64) -> Option<DateTime<Utc>> {
        let slice = Self::between(&self.samples, self.noon - 12.0 * HOUR, self.noon);
        find_crossing(slice, angle, true).map(|s| self.at(s))
    }

    /// Descending crossing of `angle` after solar noon.
    pub fn dusk(&self, angle: f64) -> Option<DateTime<Utc>> {
        let slice = Self::between(&self.samples, self.noon, self.noon + 12.0 * HOUR);
        find_crossing(slice, angle, false).map(|s| self.at(s))
    }

    fn at(&self, seconds: f64) -> DateTime<Utc> {
        self.origin + Duration::milliseconds((seconds * 1000.0).round() as i64)
    }

    fn between(samples: &[AltitudeSample], from: f64, to: f64) -> &[AltitudeSample] {
        let step = SCAN_RESOLUTION_SECONDS as f64;
        let lo = ((from / step).floor().max(0.0) as usize).min(samples.len());
        let hi = (((to / step).ceil() as usize) + 1).min(samples.len()).max(lo);
        &samples[lo..hi]
    }
}
