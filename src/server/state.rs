use crate::config::Config;
use crate::ephemeris::Almanac;
use crate::error::MetricsError;
use crate::metrics::MetricsSink;
use crate::snapshot::SnapshotBuilder;

/// Shared by every request. Built once; the sink's gauges are the only
/// state that changes between scrapes.
pub struct AppState {
    pub builder: SnapshotBuilder<Almanac>,
    pub sink: MetricsSink,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, MetricsError> {
        Ok(Self {
            builder: SnapshotBuilder::new(Almanac, config.coordinate, config.zone),
            sink: MetricsSink::new()?,
        })
    }
}
