//! Prometheus counters for the capture path.

use prometheus::{Counter, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    /// Frames accepted (parsed, stored, published).
    pub packets_captured: Counter,
    /// Malformed or non-IP frames skipped by the parser.
    pub parse_drops: Counter,
    /// Events dropped because a subscriber queue was full.
    pub subscriber_drops: Counter,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        let registry = Registry::new();
        let packets_captured = Counter::new(
            "spejare_packets_captured_total",
            "Frames accepted by the capture loop",
        )
        .unwrap();
        let parse_drops = Counter::new(
            "spejare_parse_drops_total",
            "Frames skipped because they could not be parsed",
        )
        .unwrap();
        let subscriber_drops = Counter::new(
            "spejare_subscriber_drops_total",
            "Stream events dropped due to full subscriber queues",
        )
        .unwrap();

        registry.register(Box::new(packets_captured.clone())).unwrap();
        registry.register(Box::new(parse_drops.clone())).unwrap();
        registry.register(Box::new(subscriber_drops.clone())).unwrap();

        Self {
            registry,
            packets_captured,
            parse_drops,
            subscriber_drops,
        }
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap_or_default())
    }
}
