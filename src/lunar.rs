//! Lunar position calculator based on Jean Meeus "Astronomical Algorithms" Ch. 47.
//!
//! Uses the top periodic terms from Tables 47.A and 47.B for ~0.3° accuracy.
//! On top of the position it provides the parallactic angle, the rise/set
//! scan of one day, illumination, and the search for the next new or full moon.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::f64::consts::PI;

use crate::solar::{julian_century, julian_date, normalize_degrees, obliquity_corrected, sun_ecliptic_longitude, sun_equatorial};

const DEG: f64 = PI / 180.0;

/// Mean Sun distance used for the illumination geometry, km.
const SUN_DISTANCE_KM: f64 = 149_598_000.0;

/// Altitude offset applied to the rise/set horizon, degrees.
const MOON_HORIZON: f64 = 0.133;

const SYNODIC_MONTH_DAYS: f64 = 29.530588853;
const ELONGATION_RATE: f64 = 360.0 / SYNODIC_MONTH_DAYS;

/// Phase angle of a new moon (Moon and Sun at equal ecliptic longitude).
pub const NEW_MOON: f64 = 0.0;
/// Phase angle of a full moon.
pub const FULL_MOON: f64 = 180.0;

/// Lunar position at a specific instant.
#[derive(Debug, Clone, Copy)]
pub struct LunarPosition {
    pub longitude: f64,
    pub latitude: f64,
    pub distance_km: f64,
    pub right_ascension: f64,
    pub declination: f64,
    pub altitude: f64,
    /// Degrees clockwise from north.
    pub azimuth: f64,
    /// Radians, positive west of the meridian.
    pub parallactic_angle: f64,
}

/// Illuminated fraction and orientation of the lunar disc.
#[derive(Debug, Clone, Copy)]
pub struct Illumination {
    pub fraction: f64,
    /// 0 new, 0.25 first quarter, 0.5 full, 0.75 last quarter.
    pub phase: f64,
    /// Position angle of the bright limb midpoint, radians.
    pub angle: f64,
}

// Periodic terms for longitude and distance (Table 47.A)
// Each entry: (D, M, Mp, F, coeff_l, coeff_r)
// coeff_l in units of 0.000001 degrees, coeff_r in units of 0.001 km
const TERMS_LR: [(f64, f64, f64, f64, f64, f64); 20] = [
    (0.0, 0.0, 1.0, 0.0, 6288774.0, -20905355.0),
    (2.0, 0.0, -1.0, 0.0, 1274027.0, -3699111.0),
    (2.0, 0.0, 0.0, 0.0, 658314.0, -2955968.0),
    (0.0, 0.0, 2.0, 0.0, 213618.0, -569925.0),
    (0.0, 1.0, 0.0, 0.0, -185116.0, 48888.0),
    (0.0, 0.0, 0.0, 2.0, -114332.0, -3149.0),
    (2.0, 0.0, -2.0, 0.0, 58793.0, 246158.0),
    (2.0, -1.0, -1.0, 0.0, 57066.0, -152138.0),
    (2.0, 0.0, 1.0, 0.0, 53322.0, -170733.0),
    (2.0, -1.0, 0.0, 0.0, 45758.0, -204586.0),
    (0.0, 1.0, -1.0, 0.0, -40923.0, -129620.0),
    (1.0, 0.0, 0.0, 0.0, -34720.0, 108743.0),
    (0.0, 1.0, 1.0, 0.0, -30383.0, 104755.0),
    (2.0, 0.0, 0.0, -2.0, 15327.0, 10321.0),
    (0.0, 0.0, 1.0, 2.0, -12528.0, 0.0),
    (0.0, 0.0, 1.0, -2.0, 10980.0, 79661.0),
    (4.0, 0.0, -1.0, 0.0, 10675.0, -34782.0),
    (0.0, 0.0, 3.0, 0.0, 10034.0, -23210.0),
    (4.0, 0.0, -2.0, 0.0, 8548.0, -21636.0),
    (2.0, 1.0, -1.0, 0.0, -7888.0, 24208.0),
];

// Periodic terms for latitude (Table 47.B)
// Each entry: (D, M, Mp, F, coeff_b)
const TERMS_B: [(f64, f64, f64, f64, f64); 20] = [
    (0.0, 0.0, 0.0, 1.0, 5128122.0),
    (0.0, 0.0, 1.0, 1.0, 280602.0),
    (0.0, 0.0, 1.0, -1.0, 277693.0),
    (2.0, 0.0, 0.0, -1.0, 173237.0),
    (2.0, 0.0, -1.0, 1.0, 55413.0),
    (2.0, 0.0, -1.0, -1.0, 46271.0),
    (2.0, 0.0, 0.0, 1.0, 32573.0),
    (0.0, 0.0, 2.0, 1.0, 17198.0),
    (2.0, 0.0, 1.0, -1.0, 9266.0),
    (0.0, 0.0, 2.0, -1.0, 8822.0),
    (2.0, -1.0, 0.0, -1.0, 8216.0),
    (2.0, 0.0, -2.0, -1.0, 4324.0),
    (2.0, 0.0, 1.0, 1.0, 4200.0),
    (2.0, 1.0, 0.0, -1.0, -3359.0),
    (2.0, -1.0, -1.0, 1.0, 2463.0),
    (2.0, -1.0, 0.0, 1.0, 2211.0),
    (2.0, -1.0, -1.0, -1.0, 2065.0),
    (0.0, 1.0, -1.0, -1.0, -1870.0),
    (4.0, 0.0, -1.0, -1.0, 1828.0),
    (0.0, 1.0, 0.0, 1.0, -1794.0),
];

/// Moon mean longitude (L'), degrees
fn moon_mean_longitude(t: f64) -> f64 {
    normalize_degrees(
        218.3164477 + 481267.88123421 * t
            - 0.0015786 * t * t
            + t * t * t / 538841.0
            - t * t * t * t / 65194000.0,
    )
}

/// Moon mean elongation (D), degrees
fn moon_mean_elongation(t: f64) -> f64 {
    normalize_degrees(
        297.8501921 + 445267.1114034 * t
            - 0.0018819 * t * t
            + t * t * t / 545868.0
            - t * t * t * t / 113065000.0,
    )
}

/// Sun mean anomaly (M), degrees
fn sun_mean_anomaly(t: f64) -> f64 {
    normalize_degrees(
        357.5291092 + 35999.0502909 * t
            - 0.0001536 * t * t
            + t * t * t / 24490000.0,
    )
}

/// Moon mean anomaly (M'), degrees
fn moon_mean_anomaly(t: f64) -> f64 {
    normalize_degrees(
        134.9633964 + 477198.8675055 * t
            + 0.0087414 * t * t
            + t * t * t / 69699.0
            - t * t * t * t / 14712000.0,
    )
}

/// Moon argument of latitude (F), degrees
fn moon_argument_of_latitude(t: f64) -> f64 {
    normalize_degrees(
        93.2720950 + 483202.0175233 * t
            - 0.0036539 * t * t
            - t * t * t / 3526000.0
            + t * t * t * t / 863310000.0,
    )
}

/// Compute ecliptic coordinates of the Moon.
/// Returns (longitude_deg, latitude_deg, distance_km).
fn moon_ecliptic(t: f64) -> (f64, f64, f64) {
    let lp = moon_mean_longitude(t);
    let d = moon_mean_elongation(t);
    let m = sun_mean_anomaly(t);
    let mp = moon_mean_anomaly(t);
    let f = moon_argument_of_latitude(t);

    // Earth eccentricity correction
    let e = 1.0 - 0.002516 * t - 0.0000074 * t * t;
    let e2 = e * e;

    let mut sum_l: f64 = 0.0;
    let mut sum_r: f64 = 0.0;

    for &(td, tm, tmp, tf, cl, cr) in &TERMS_LR {
        let arg = (td * d + tm * m + tmp * mp + tf * f) * DEG;
        let m_abs = tm.abs() as i32;
        let e_factor = if m_abs == 1 { e } else if m_abs == 2 { e2 } else { 1.0 };
        sum_l += cl * e_factor * arg.sin();
        sum_r += cr * e_factor * arg.cos();
    }

    let mut sum_b: f64 = 0.0;
    for &(td, tm, tmp, tf, cb) in &TERMS_B {
        let arg = (td * d + tm * m + tmp * mp + tf * f) * DEG;
        let m_abs = tm.abs() as i32;
        let e_factor = if m_abs == 1 { e } else if m_abs == 2 { e2 } else { 1.0 };
        sum_b += cb * e_factor * arg.sin();
    }

    // Additive corrections (A1, A2, A3)
    let a1 = normalize_degrees(119.75 + 131.849 * t);
    let a2 = normalize_degrees(53.09 + 479264.290 * t);
    let a3 = normalize_degrees(313.45 + 481266.484 * t);

    sum_l += 3958.0 * (a1 * DEG).sin();
    sum_l += 1962.0 * ((lp - f) * DEG).sin();
    sum_l += 318.0 * (a2 * DEG).sin();

    sum_b += -2235.0 * (lp * DEG).sin();
    sum_b += 382.0 * (a3 * DEG).sin();
    sum_b += 175.0 * ((a1 - f) * DEG).sin();
    sum_b += 175.0 * ((a1 + f) * DEG).sin();
    sum_b += 127.0 * ((lp - mp) * DEG).sin();
    sum_b += -115.0 * ((lp + mp) * DEG).sin();

    let longitude = normalize_degrees(lp + sum_l / 1_000_000.0);
    let latitude = sum_b / 1_000_000.0;
    let distance = 385000.56 + sum_r / 1000.0;

    (longitude, latitude, distance)
}

/// Local sidereal time in degrees for a given JD and longitude.
fn local_sidereal_time(jd: f64, lon: f64) -> f64 {
    let t = julian_century(jd);
    let gmst = normalize_degrees(
        280.46061837 + 360.98564736629 * (jd - 2451545.0)
            + 0.000387933 * t * t
            - t * t * t / 38710000.0,
    );
    normalize_degrees(gmst + lon)
}

/// Ecliptic to equatorial coordinate transform.
/// Returns (right_ascension_deg, declination_deg).
fn ecliptic_to_equatorial(lon: f64, lat: f64, obliquity: f64) -> (f64, f64) {
    let lon_r = lon * DEG;
    let lat_r = lat * DEG;
    let obl_r = obliquity * DEG;

    let sin_ra = lon_r.sin() * obl_r.cos() - lat_r.tan() * obl_r.sin();
    let cos_ra = lon_r.cos();
    let ra = normalize_degrees(sin_ra.atan2(cos_ra) / DEG);

    let sin_dec = lat_r.sin() * obl_r.cos() + lat_r.cos() * obl_r.sin() * lon_r.sin();
    let dec = sin_dec.asin() / DEG;

    (ra, dec)
}

/// Equatorial to horizontal coordinate transform for a local hour angle.
/// Returns (altitude_deg, azimuth_deg).
fn equatorial_to_horizontal(ha: f64, dec: f64, lat: f64) -> (f64, f64) {
    let ha_r = ha * DEG;
    let dec_r = dec * DEG;
    let lat_r = lat * DEG;

    let sin_alt = lat_r.sin() * dec_r.sin() + lat_r.cos() * dec_r.cos() * ha_r.cos();
    let alt = sin_alt.asin() / DEG;

    let cos_az = (dec_r.sin() - sin_alt * lat_r.sin()) / (sin_alt.asin().cos() * lat_r.cos());
    let az = cos_az.clamp(-1.0, 1.0).acos() / DEG;
    let azimuth = if ha_r.sin() > 0.0 { 360.0 - az } else { az };

    (alt, azimuth)
}

/// Angle at the Moon between the celestial pole and the zenith, radians.
fn parallactic_angle(ha: f64, dec: f64, lat: f64) -> f64 {
    let ha_r = ha * DEG;
    let dec_r = dec * DEG;
    let lat_r = lat * DEG;
    ha_r.sin().atan2(lat_r.tan() * dec_r.cos() - dec_r.sin() * ha_r.cos())
}

/// Apply topocentric parallax correction to the Moon's altitude.
/// The Moon's horizontal parallax is approximately asin(6378.14 / distance_km).
fn topocentric_correction(geo_alt: f64, distance_km: f64) -> f64 {
    let hp = (6378.14 / distance_km).asin();
    let parallax = hp * (geo_alt * DEG).cos();
    geo_alt - parallax / DEG
}

/// Apply atmospheric refraction correction (Bennett).
fn refraction_correction(apparent_alt: f64) -> f64 {
    if apparent_alt < -1.0 {
        return apparent_alt;
    }
    let r = 1.02 / ((apparent_alt + 10.3 / (apparent_alt + 5.11)) * DEG).tan();
    apparent_alt + r / 60.0
}

/// Compute the full lunar position for a UTC instant and observer location.
pub fn lunar_position(at: &DateTime<Utc>, lat: f64, lon: f64) -> LunarPosition {
    let jd = julian_date(at);
    let t = julian_century(jd);

    let (moon_lon, moon_lat, distance) = moon_ecliptic(t);
    let obliquity = obliquity_corrected(t);
    let (ra, dec) = ecliptic_to_equatorial(moon_lon, moon_lat, obliquity);

    let ha = normalize_degrees(local_sidereal_time(jd, lon) - ra);
    let (geo_alt, azimuth) = equatorial_to_horizontal(ha, dec, lat);

    let altitude = refraction_correction(topocentric_correction(geo_alt, distance));

    LunarPosition {
        longitude: moon_lon,
        latitude: moon_lat,
        distance_km: distance,
        right_ascension: ra,
        declination: dec,
        altitude,
        azimuth,
        parallactic_angle: parallactic_angle(ha, dec, lat),
    }
}

/// Moon minus Sun ecliptic longitude in [0, 360): 0° at new moon, 180° at full.
pub fn phase_angle(at: &DateTime<Utc>) -> f64 {
    let (moon_lon, _, _) = moon_ecliptic(julian_century(julian_date(at)));
    normalize_degrees(moon_lon - sun_ecliptic_longitude(at))
}

/// Illumination of the Moon as seen from the geocentre.
pub fn illumination(at: &DateTime<Utc>) -> Illumination {
    let t = julian_century(julian_date(at));
    let (moon_lon, moon_lat, distance) = moon_ecliptic(t);
    let (ra_m, dec_m) = ecliptic_to_equatorial(moon_lon, moon_lat, obliquity_corrected(t));
    let (ra_s, dec_s) = sun_equatorial(at);

    let (am, dm) = (ra_m * DEG, dec_m * DEG);
    let (as_, ds) = (ra_s * DEG, dec_s * DEG);

    let phi = (ds.sin() * dm.sin() + ds.cos() * dm.cos() * (as_ - am).cos())
        .clamp(-1.0, 1.0)
        .acos();
    let inc = (SUN_DISTANCE_KM * phi.sin()).atan2(distance - SUN_DISTANCE_KM * phi.cos());
    let angle = (ds.cos() * (as_ - am).sin())
        .atan2(ds.sin() * dm.cos() - ds.cos() * dm.sin() * (as_ - am).cos());

    let sign = if angle < 0.0 { -1.0 } else { 1.0 };
    Illumination {
        fraction: (1.0 + inc.cos()) / 2.0,
        phase: (0.5 + 0.5 * inc * sign / PI).rem_euclid(1.0),
        angle,
    }
}

/// First instant strictly after `at` at which the phase angle reaches `target`.
///
/// Seeded from the mean elongation rate, then refined iteratively.
pub fn next_phase(at: &DateTime<Utc>, target: f64) -> Option<DateTime<Utc>> {
    let ahead = normalize_degrees(target - phase_angle(at));
    let seed = if ahead > 0.0 { ahead / ELONGATION_RATE } else { SYNODIC_MONTH_DAYS };

    let mut days = refine_phase(at, target, seed)?;
    if days <= 0.0 {
        days = refine_phase(at, target, days + SYNODIC_MONTH_DAYS)?;
    }
    days_later(at, days)
}

fn refine_phase(at: &DateTime<Utc>, target: f64, mut days: f64) -> Option<f64> {
    for _ in 0..10 {
        let probe = days_later(at, days)?;
        let diff = (target - phase_angle(&probe) + 180.0).rem_euclid(360.0) - 180.0;
        days += diff / ELONGATION_RATE;
        if diff.abs() < 1e-5 {
            break;
        }
    }
    days.is_finite().then_some(days)
}

fn days_later(at: &DateTime<Utc>, days: f64) -> Option<DateTime<Utc>> {
    if !days.is_finite() {
        return None;
    }
    at.checked_add_signed(Duration::milliseconds((days * 86_400_000.0).round() as i64))
}

/// Moonrise, moonset and upper culmination within one local mean-solar day.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoonDay {
    pub rise: Option<DateTime<Utc>>,
    pub set: Option<DateTime<Utc>>,
    pub highest: Option<DateTime<Utc>>,
}

impl MoonDay {
    /// Scan the 24 h from local mean midnight of `date`, fitting a quadratic
    /// through each pair of hourly altitude samples.
    pub fn scan(date: NaiveDate, lat: f64, lon: f64) -> Self {
        let origin = date.and_time(NaiveTime::MIN).and_utc()
            - Duration::milliseconds((lon * 240_000.0).round() as i64);
        let hours_later = |h: f64| origin + Duration::milliseconds((h * 3_600_000.0).round() as i64);
        let altitude = |h: f64| lunar_position(&hours_later(h), lat, lon).altitude - MOON_HORIZON;

        let mut rise: Option<f64> = None;
        let mut set: Option<f64> = None;
        let mut highest: Option<(f64, f64)> = None;

        let mut h0 = altitude(0.0);
        let mut hour = 1.0;
        while hour < 24.0 {
            let h1 = altitude(hour);
            let h2 = altitude(hour + 1.0);
            let a = (h0 + h2) / 2.0 - h1;
            let b = (h2 - h0) / 2.0;

            for (x, ascending) in quadratic_roots(a, b, h1) {
                if ascending {
                    rise.get_or_insert(hour + x);
                } else {
                    set.get_or_insert(hour + x);
                }
            }

            if a < 0.0 {
                let xe = -b / (2.0 * a);
                let ye = (a * xe + b) * xe + h1;
                if xe.abs() <= 1.0 && highest.map_or(true, |(_, best)| ye > best) {
                    highest = Some((hour + xe, ye));
                }
            }

            h0 = h2;
            hour += 2.0;
        }

        Self {
            rise: rise.map(hours_later),
            set: set.map(hours_later),
            highest: highest.map(|(h, _)| hours_later(h)),
        }
    }
}

/// Roots in [-1, 1] of `a·x² + b·x + c`, each tagged with whether the curve
/// is rising through it. Sorted by x.
fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<(f64, bool)> {
    let mut roots = Vec::with_capacity(2);
    if a.abs() < 1e-12 {
        if b.abs() > 1e-12 {
            let x = -c / b;
            if x.abs() <= 1.0 {
                roots.push((x, b > 0.0));
            }
        }
        return roots;
    }

    let d = b * b - 4.0 * a * c;
    if d < 0.0 {
        return roots;
    }
    let xe = -b / (2.0 * a);
    let dx = d.sqrt() / (a.abs() * 2.0);
    for x in [xe - dx, xe + dx] {
        if x.abs() <= 1.0 && (roots.is_empty() || dx > 0.0) {
            roots.push((x, 2.0 * a * x + b > 0.0));
        }
    }
    roots
}
