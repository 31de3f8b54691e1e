//! Quantities the ephemeris does not expose directly.

use chrono::{DateTime, Duration, Utc};

use crate::ephemeris::{Coordinate, Ephemeris, MoonIllumination};
use crate::error::ComputationError;
use crate::resolver::seconds_until;

/// Illuminated-fraction threshold between the waxing and waning halves.
const HALF_ILLUMINATED: f64 = 0.5;
/// How far back to look for the last new moon while waxing.
const WAXING_ANCHOR_DAYS: i64 = 21;
/// How far back to look for the last new moon while waning.
const WANING_ANCHOR_DAYS: i64 = 35;

/// Angle of the bright limb measured from the zenith, degrees.
///
/// Plain difference, not wrapped into `[0, 360)`.
pub fn zenith_angle(parallactic_degrees: f64, illumination_angle_degrees: f64) -> f64 {
    parallactic_degrees - illumination_angle_degrees
}

/// How far before `now` to query for the last new moon. Exactly half
/// illuminated counts as waning.
pub fn moon_age_anchor(fraction: f64) -> Duration {
    if fraction < HALF_ILLUMINATED {
        Duration::days(WAXING_ANCHOR_DAYS)
    } else {
        Duration::days(WANING_ANCHOR_DAYS)
    }
}

/// Seconds since the most recent new moon, unrounded.
///
/// The ephemeris only predicts the *next* new moon from an instant, so it is
/// asked from an anchor far enough back to land in the previous cycle.
/// `current` is the illumination at `now`; its fraction must be unrounded.
pub fn moon_age<P: Ephemeris + ?Sized>(
    provider: &P,
    coordinate: Coordinate,
    now: DateTime<Utc>,
    current: &MoonIllumination,
) -> Result<f64, ComputationError> {
    let anchor = now
        .checked_sub_signed(moon_age_anchor(current.fraction))
        .ok_or(ComputationError::TimeOutOfRange { context: "moon age anchor" })?;
    let last_new_moon = provider.moon_illumination(anchor, coordinate)?.next_new_moon;
    Ok(seconds_until(now, last_new_moon))
}
