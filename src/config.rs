//! Validated process configuration. Built once at startup and never changed.

use std::net::{IpAddr, SocketAddr};

use crate::calendar::Zone;
use crate::ephemeris::Coordinate;
use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 3418;
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub coordinate: Coordinate,
    pub listen: SocketAddr,
    pub zone: Zone,
}

/// Raw, unvalidated settings as they arrive from the command line.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub listen_address: Option<String>,
    pub listen_port: Option<u16>,
    pub timezone: Option<String>,
}

impl Config {
    pub fn from_raw(raw: &RawConfig) -> Result<Self, ConfigError> {
        let latitude = raw.latitude.ok_or(ConfigError::MissingLatitude)?;
        let longitude = raw.longitude.ok_or(ConfigError::MissingLongitude)?;
        let coordinate = Coordinate::new(latitude, longitude)?;

        let address = raw.listen_address.as_deref().unwrap_or(DEFAULT_ADDRESS);
        let ip: IpAddr = address
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddress(address.to_string()))?;
        let listen = SocketAddr::new(ip, raw.listen_port.unwrap_or(DEFAULT_PORT));

        let zone = Zone::parse(raw.timezone.as_deref())?;

        Ok(Self { coordinate, listen, zone })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn london() -> RawConfig {
        RawConfig { latitude: Some(51.5), longitude: Some(-0.12), ..Default::default() }
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_raw(&london()).unwrap();
        assert_eq!(config.listen, "0.0.0.0:3418".parse().unwrap());
        assert_eq!(config.zone, Zone::System);
        assert_eq!(config.coordinate, Coordinate { latitude: 51.5, longitude: -0.12 });
    }

    #[test]
    fn test_missing_coordinates_are_fatal() {
        let raw = RawConfig { latitude: None, ..london() };
        assert_eq!(Config::from_raw(&raw), Err(ConfigError::MissingLatitude));
        let raw = RawConfig { longitude: None, ..london() };
        assert_eq!(Config::from_raw(&raw), Err(ConfigError::MissingLongitude));
    }

    #[test]
    fn test_out_of_range_coordinates() {
        let raw = RawConfig { latitude: Some(-91.0), ..london() };
        assert_eq!(Config::from_raw(&raw), Err(ConfigError::LatitudeOutOfRange(-91.0)));
        let raw = RawConfig { longitude: Some(180.5), ..london() };
        assert_eq!(Config::from_raw(&raw), Err(ConfigError::LongitudeOutOfRange(180.5)));
    }

    #[test]
    fn test_listen_address_and_port() {
        let raw = RawConfig { listen_address: Some("::1".into()), listen_port: Some(9100), ..london() };
        assert_eq!(Config::from_raw(&raw).unwrap().listen, "[::1]:9100".parse().unwrap());

        let raw = RawConfig { listen_address: Some("localhost".into()), ..london() };
        assert_eq!(
            Config::from_raw(&raw),
            Err(ConfigError::InvalidListenAddress("localhost".into()))
        );
    }

    #[test]
    fn test_timezone() {
        let raw = RawConfig { timezone: Some("Europe/Stockholm".into()), ..london() };
        assert_eq!(Config::from_raw(&raw).unwrap().zone, Zone::Named(chrono_tz::Europe::Stockholm));

        let raw = RawConfig { timezone: Some("Nowhere/Land".into()), ..london() };
        assert!(matches!(Config::from_raw(&raw), Err(ConfigError::UnknownTimezone(_))));
    }
}
