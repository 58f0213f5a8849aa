//! # CLI
//!
//! This module defines the command-line interface of `grpc-probe` using `clap`.
//!
//! It is responsible for parsing user input and assembling the [`ProbeSpec`] from an optional
//! module file and the individual flags, flags taking precedence.
use anyhow::Context;
use clap::Parser;
use grpc_probe_core::ProbeSpec;
use std::{path::PathBuf, time::Duration};

#[derive(Parser, Debug)]
#[command(
    name = "grpc-probe",
    version,
    about = "Probe a gRPC endpoint through server reflection"
)]
pub struct Cli {
    /// The target to probe, in host:port form (e.g. localhost:50051)
    pub target: String,

    /// JSON file with the probe module (service, method, message_type, ...)
    #[arg(long)]
    pub module: Option<PathBuf>,

    /// Fully qualified service name (e.g. grpc.health.v1.Health)
    #[arg(long)]
    pub service: Option<String>,

    /// Method name inside the service (e.g. Check)
    #[arg(long)]
    pub method: Option<String>,

    /// Request message type, declared in the same file as the service (e.g. HealthCheckRequest)
    #[arg(long)]
    pub message_type: Option<String>,

    /// Expected response in Protobuf text format. Any response is accepted when omitted
    #[arg(long)]
    pub response_message: Option<String>,

    /// Do not verify the server certificate
    #[arg(long)]
    pub insecure_skip_verify: bool,

    /// Probe timeout in seconds
    #[arg(long, default_value = "5", value_parser = parse_timeout)]
    pub timeout: Duration,
}

impl Cli {
    /// Builds the probe spec from the module file (if any) and the flags.
    pub fn probe_spec(&self) -> anyhow::Result<ProbeSpec> {
        let mut spec = match &self.module {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read module file '{}'", path.display()))?;
                ProbeSpec::from_json(&json)
                    .with_context(|| format!("Invalid module file '{}'", path.display()))?
            }
            None => ProbeSpec::default(),
        };

        if let Some(service) = &self.service {
            spec.service = service.clone();
        }
        if let Some(method) = &self.method {
            spec.method = method.clone();
        }
        if let Some(message_type) = &self.message_type {
            spec.message_type = message_type.clone();
        }
        if let Some(response_message) = &self.response_message {
            spec.response_message = response_message.clone();
        }
        spec.insecure_skip_verify |= self.insecure_skip_verify;

        for (flag, value) in [
            ("--service", &spec.service),
            ("--method", &spec.method),
            ("--message-type", &spec.message_type),
        ] {
            anyhow::ensure!(
                !value.trim().is_empty(),
                "{flag} is required (either as a flag or in the module file)"
            );
        }

        Ok(spec)
    }
}

fn parse_timeout(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|e| format!("Invalid timeout '{value}': {e}"))?;

    if secs <= 0.0 {
        return Err("Timeout must be a positive number of seconds".to_string());
    }

    Duration::try_from_secs_f64(secs).map_err(|e| format!("Invalid timeout '{value}': {e}"))
}
