//! # Probe Metrics
//!
//! Metrics recorded on the caller's Prometheus registry.

use prometheus::{Gauge, Registry};

pub const PROBE_SUCCESS_GAUGE: &str = "grpc_probe_success";
pub const PROBE_SUCCESS_HELP: &str = "Displays whether or not the grpc probe was a success";

/// The `grpc_probe_success` gauge of one probe. Stays at 0 until [`ProbeMetrics::record_success`].
#[derive(Debug, Clone)]
pub struct ProbeMetrics {
    success: Gauge,
}

impl ProbeMetrics {
    /// Creates the gauge and registers it on `registry`.
    ///
    /// Fails if `registry` already holds a collector with the same name.
    pub fn register(registry: &Registry) -> prometheus::Result<Self> {
        let success = Gauge::new(PROBE_SUCCESS_GAUGE, PROBE_SUCCESS_HELP)?;
        registry.register(Box::new(success.clone()))?;
        Ok(Self { success })
    }

    pub fn record_success(&self) {
        self.success.set(1.0);
    }

    pub fn success(&self) -> f64 {
        self.success.get()
    }
}
