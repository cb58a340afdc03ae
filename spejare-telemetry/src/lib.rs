//! # spejare-telemetry
//!
//! Observability for the capture service: structured logging setup and the
//! Prometheus counters for capture-path anomalies that are absorbed rather
//! than surfaced (parse drops, slow-subscriber drops).

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
