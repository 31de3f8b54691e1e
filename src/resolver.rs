//! Event resolution: turns today's and tomorrow's event tables into
//! "seconds until the next occurrence" values.
//!
//! For every event the occurrence used is today's if it has not happened yet,
//! otherwise tomorrow's. Events that do not occur today (polar day or night,
//! a moon that never rises) are skipped for the whole pass.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::calendar::Zone;
use crate::ephemeris::{CelestialEvent, Coordinate, Ephemeris, EventTime, EventTimes, MoonEvent, SunEvent};
use crate::error::ComputationError;

/// One event resolved against `now`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedEvent<E> {
    pub event: E,
    pub occurrence: DateTime<Utc>,
    /// Unrounded seconds from `now` to `occurrence`.
    pub seconds_until: f64,
}

/// Seconds from `now` to `at`, millisecond precision.
pub fn seconds_until(at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (at - now).num_milliseconds() as f64 / 1000.0
}

/// Pick the occurrence of one event: today's unless it already passed.
pub fn select_occurrence(
    today: Option<&EventTime>,
    tomorrow: Option<&EventTime>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let today = today.filter(|e| e.valid)?;
    if today.timestamp >= now {
        return Some(today.timestamp);
    }
    tomorrow.filter(|e| e.valid).map(|e| e.timestamp)
}

/// Resolve every event of family `E`, in declaration order.
pub fn resolve<E: CelestialEvent>(
    today: &EventTimes<E>,
    tomorrow: &EventTimes<E>,
    now: DateTime<Utc>,
) -> Vec<ResolvedEvent<E>> {
    E::ALL
        .iter()
        .filter_map(|&event| {
            let Some(occurrence) = select_occurrence(today.get(&event), tomorrow.get(&event), now) else {
                debug!(event = %event.label(), "event does not occur, skipping");
                return None;
            };
            Some(ResolvedEvent { event, occurrence, seconds_until: seconds_until(occurrence, now) })
        })
        .collect()
}

/// Queries the ephemeris for the two days a resolution pass needs.
pub struct EventResolver<'a, P: ?Sized> {
    provider: &'a P,
    coordinate: Coordinate,
    zone: Zone,
}

impl<'a, P: Ephemeris + ?Sized> EventResolver<'a, P> {
    pub fn new(provider: &'a P, coordinate: Coordinate, zone: Zone) -> Self {
        Self { provider, coordinate, zone }
    }

    pub fn sun_events(&self, now: DateTime<Utc>) -> Result<Vec<ResolvedEvent<SunEvent>>, ComputationError> {
        let (today, tomorrow) = self.anchors(now)?;
        let today = self.provider.sun_events(today, self.coordinate)?;
        let tomorrow = self.provider.sun_events(tomorrow, self.coordinate)?;
        Ok(resolve(&today, &tomorrow, now))
    }

    pub fn moon_events(&self, now: DateTime<Utc>) -> Result<Vec<ResolvedEvent<MoonEvent>>, ComputationError> {
        let (today, tomorrow) = self.anchors(now)?;
        let today = self.provider.moon_events(today, self.coordinate)?;
        let tomorrow = self.provider.moon_events(tomorrow, self.coordinate)?;
        Ok(resolve(&today, &tomorrow, now))
    }

    /// Today's and tomorrow's local dates, as UTC wall-clock instants.
    fn anchors(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), ComputationError> {
        Ok((self.zone.wall_clock(now), self.zone.next_day_boundary(now)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::Almanac;
    use crate::test_support::{utc, StubEphemeris};
    use chrono::{Duration, NaiveDate, TimeZone};

    const LONDON: Coordinate = Coordinate { latitude: 51.5, longitude: -0.12 };

    fn utc_zone() -> Zone {
        Zone::parse(Some("UTC")).unwrap()
    }

    fn table(entries: &[(SunEvent, EventTime)]) -> EventTimes<SunEvent> {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_future_event_uses_today() {
        let now = utc(2024, 1, 15, 10, 0);
        let today = table(&[(SunEvent::SunsetStart, EventTime::at(utc(2024, 1, 15, 16, 15)))]);
        let tomorrow = table(&[(SunEvent::SunsetStart, EventTime::at(utc(2024, 1, 16, 16, 17)))]);

        let resolved = resolve(&today, &tomorrow, now);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].occurrence, utc(2024, 1, 15, 16, 15));
        assert_eq!(resolved[0].seconds_until, 6.25 * 3600.0);
    }

    #[test]
    fn test_past_event_rolls_over_to_tomorrow() {
        let now = utc(2024, 1, 15, 23, 0);
        let today = table(&[(SunEvent::SunsetStart, EventTime::at(utc(2024, 1, 15, 16, 15)))]);
        let tomorrow = table(&[(SunEvent::SunsetStart, EventTime::at(utc(2024, 1, 16, 16, 17)))]);

        let resolved = resolve(&today, &tomorrow, now);
        assert_eq!(resolved[0].occurrence, utc(2024, 1, 16, 16, 17));
        assert!(resolved[0].seconds_until >= 0.0);
    }

    #[test]
    fn test_event_at_now_is_not_rolled_over() {
        let now = utc(2024, 1, 15, 12, 0);
        let today = table(&[(SunEvent::SolarNoon, EventTime::at(now))]);
        let tomorrow = table(&[(SunEvent::SolarNoon, EventTime::at(now + Duration::days(1)))]);
        assert_eq!(resolve(&today, &tomorrow, now)[0].seconds_until, 0.0);
    }

    #[test]
    fn test_invalid_today_is_skipped() {
        let now = utc(2024, 6, 21, 10, 0);
        let today = table(&[(SunEvent::SunriseStart, EventTime::absent(now))]);
        let tomorrow = table(&[(SunEvent::SunriseStart, EventTime::at(utc(2024, 6, 22, 1, 0)))]);
        assert!(resolve(&today, &tomorrow, now).is_empty());
    }

    #[test]
    fn test_past_today_with_invalid_tomorrow_is_skipped() {
        let now = utc(2024, 5, 20, 23, 0);
        let today = table(&[(SunEvent::SunsetEnd, EventTime::at(utc(2024, 5, 20, 22, 58)))]);
        let tomorrow = table(&[(SunEvent::SunsetEnd, EventTime::absent(utc(2024, 5, 21, 0, 0)))]);
        assert!(resolve(&today, &tomorrow, now).is_empty());
    }

    #[test]
    fn test_missing_entry_is_skipped() {
        let now = utc(2024, 1, 15, 10, 0);
        let today = table(&[(SunEvent::SolarNoon, EventTime::at(utc(2024, 1, 15, 12, 10)))]);
        let resolved = resolve(&today, &EventTimes::new(), now);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].event, SunEvent::SolarNoon);
    }

    #[test]
    fn test_resolver_queries_local_dates() {
        // 23:00 UTC on the 15th is already the 16th in Tokyo: today's table is
        // the 16th and tomorrow's the 17th.
        let now = utc(2024, 1, 15, 23, 0);
        let mut stub = StubEphemeris::default();
        stub.sun_days.insert(
            NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
            table(&[(SunEvent::SolarNoon, EventTime::at(utc(2024, 1, 16, 2, 45)))]),
        );
        stub.sun_days.insert(
            NaiveDate::from_ymd_opt(2024, 1, 17).unwrap(),
            table(&[(SunEvent::SolarNoon, EventTime::at(utc(2024, 1, 17, 2, 45)))]),
        );

        let zone = Zone::parse(Some("Asia/Tokyo")).unwrap();
        let resolved = EventResolver::new(&stub, LONDON, zone).sun_events(now).unwrap();
        assert_eq!(resolved[0].occurrence, utc(2024, 1, 16, 2, 45));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let now = utc(2024, 1, 15, 9, 30);
        let resolver = EventResolver::new(&Almanac, LONDON, utc_zone());
        let first = resolver.sun_events(now).unwrap();
        let second = resolver.sun_events(now).unwrap();
        assert_eq!(first, second);
        assert_eq!(resolver.moon_events(now).unwrap(), resolver.moon_events(now).unwrap());
    }

    #[test]
    fn test_london_late_evening_sunset_rolls_over() {
        let zone = Zone::parse(Some("Europe/London")).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 23, 0, 0).unwrap();
        let resolved = EventResolver::new(&Almanac, LONDON, zone).sun_events(now).unwrap();

        let sunset = resolved.iter().find(|r| r.event == SunEvent::SunsetStart).unwrap();
        assert!(
            (15.0 * 3600.0..=20.0 * 3600.0).contains(&sunset.seconds_until),
            "tomorrow's sunset expected 15-20h away, got {:.0}s",
            sunset.seconds_until
        );
        assert!(resolved.iter().all(|r| r.seconds_until >= 0.0), "{:?}", resolved);
        assert_eq!(resolved.len(), SunEvent::ALL.len());
    }

    #[test]
    fn test_polar_day_omits_horizon_events() {
        let svalbard = Coordinate { latitude: 78.2232, longitude: 15.6267 };
        let now = utc(2024, 6, 21, 6, 0);
        let resolved = EventResolver::new(&Almanac, svalbard, utc_zone()).sun_events(now).unwrap();
        let events: Vec<SunEvent> = resolved.iter().map(|r| r.event).collect();

        assert!(!events.contains(&SunEvent::SunriseStart));
        assert!(!events.contains(&SunEvent::SunsetStart));
        assert!(events.contains(&SunEvent::SolarNoon));
        assert!(events.contains(&SunEvent::Nadir));
    }
}
