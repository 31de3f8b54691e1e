//! Prometheus exporter for the sky above one fixed location: sun and moon
//! position, time until the next rise, set and twilight events, and lunar
//! illumination.

pub mod calendar;
pub mod config;
pub mod derived;
pub mod ephemeris;
pub mod error;
pub mod lunar;
pub mod metrics;
pub mod resolver;
pub mod server;
pub mod snapshot;
pub mod solar;

#[cfg(test)]
mod test_support;
