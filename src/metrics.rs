//! Metrics sink: one Prometheus registry holding a gauge family per catalog
//! metric, created once at startup and written on every scrape.

use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;

use crate::error::MetricsError;
use crate::snapshot::{Metric, Snapshot};

enum Family {
    Plain(Gauge),
    Labeled(GaugeVec),
}

pub struct MetricsSink {
    registry: Registry,
    families: HashMap<Metric, Family>,
}

impl MetricsSink {
    /// Register every catalog metric in a fresh registry.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();
        let mut families = HashMap::with_capacity(Metric::ALL.len());

        for metric in Metric::ALL {
            let opts = Opts::new(metric.name(), metric.help());
            let family = match metric.label_key() {
                Some(key) => {
                    let vec = GaugeVec::new(opts, &[key])?;
                    registry.register(Box::new(vec.clone()))?;
                    Family::Labeled(vec)
                }
                None => {
                    let gauge = Gauge::with_opts(opts)?;
                    registry.register(Box::new(gauge.clone()))?;
                    Family::Plain(gauge)
                }
            };
            families.insert(metric, family);
        }

        Ok(Self { registry, families })
    }

    /// Write every observation. Series absent from the snapshot keep their
    /// last value.
    pub fn record(&self, snapshot: &Snapshot) -> Result<(), MetricsError> {
        for observation in &snapshot.observations {
            match self.families.get(&observation.metric) {
                Some(Family::Plain(gauge)) => gauge.set(observation.value),
                Some(Family::Labeled(vec)) => {
                    let labels: HashMap<&str, &str> = observation
                        .labels
                        .iter()
                        .map(|(k, v)| (k.as_str(), v.as_str()))
                        .collect();
                    vec.get_metric_with(&labels)?.set(observation.value);
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Text exposition of the whole registry.
    pub fn render(&self) -> Result<String, MetricsError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}
