//! # Probe Configuration
//!
//! The [`ProbeSpec`] describes what a single probe checks on the target. It is normally
//! part of a larger module configuration owned by the caller and can be loaded from JSON.
use serde::Deserialize;

/// Describes the method to call on the target and how to judge its response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeSpec {
    /// Fully qualified service name (e.g. `grpc.health.v1.Health`).
    pub service: String,
    /// Method name inside the service (e.g. `Check`).
    pub method: String,
    /// Name of the request message type, declared in the same file as the service
    /// (e.g. `HealthCheckRequest`).
    pub message_type: String,
    /// Expected text format of the response. Empty accepts any response.
    #[serde(default)]
    pub response_message: String,
    /// Skip verification of the server certificate chain and host name.
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl ProbeSpec {
    /// Parses a spec from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
