//! Error types for configuration, ephemeris computation, and metrics exposition.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Startup configuration errors. Fatal: the exporter never serves with
/// defaulted coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("missing latitude (use --latitude)")]
    MissingLatitude,
    #[error("missing longitude (use --longitude)")]
    MissingLongitude,
    #[error("latitude {0} is outside -90..90")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is outside -180..180")]
    LongitudeOutOfRange(f64),
    #[error("unknown timezone '{0}', use an IANA name such as Europe/London")]
    UnknownTimezone(String),
    #[error("invalid listen address '{0}'")]
    InvalidListenAddress(String),
}

/// The ephemeris could not produce a usable value for one instant and
/// coordinate. Scoped to a single scrape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputationError {
    #[error("ephemeris produced a non-finite {quantity}")]
    NonFinite { quantity: &'static str },
    #[error("instant out of range while computing {context}")]
    TimeOutOfRange { context: &'static str },
}

impl Serialize for ComputationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Registry or exposition failures.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metrics registry error: {0}")]
    Registry(#[from] prometheus::Error),
    #[error("exposition is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::LatitudeOutOfRange(91.5).to_string(),
            "latitude 91.5 is outside -90..90"
        );
        assert!(ConfigError::UnknownTimezone("Mars/Olympus".into())
            .to_string()
            .contains("Mars/Olympus"));
    }

    #[test]
    fn test_computation_error_messages() {
        let err = ComputationError::NonFinite { quantity: "moon distance" };
        assert_eq!(err.to_string(), "ephemeris produced a non-finite moon distance");
    }
}
