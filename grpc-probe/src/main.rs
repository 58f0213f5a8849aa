//! # gRPC Probe CLI Entry Point
//!
//! Runs a single probe and prints the result the way a metrics scrape would see it:
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`] and installs the
//!    `tracing` subscriber (filtered by `RUST_LOG`, logs go to stderr).
//! 2. **Probe**: Delegates to [`grpc_probe_core::probe_grpc`] with a fresh registry. Ctrl-C
//!    cancels the probe.
//! 3. **Presentation**: Prints the registry in the Prometheus text exposition format to
//!    standard output and exits with `0` on success, `1` otherwise.
mod cli;

use clap::Parser;
use cli::Cli;
use grpc_probe_core::prometheus::{Encoder, Registry, TextEncoder};
use grpc_probe_core::{ProbeContext, probe_grpc};
use std::process;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let spec = match args.probe_spec() {
        Ok(spec) => spec,
        Err(err) => {
            eprintln!("{err:#}");
            process::exit(2);
        }
    };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling probe");
                cancel.cancel();
            }
        }
    });

    let ctx = ProbeContext::with_timeout(args.timeout).cancellation_token(cancel);
    let registry = Registry::new();

    let success = probe_grpc(&args.target, &spec, &registry, &ctx).await;

    let mut buf = Vec::new();
    match TextEncoder::new().encode(&registry.gather(), &mut buf) {
        Ok(()) => print!("{}", String::from_utf8_lossy(&buf)),
        Err(err) => tracing::error!(error = %err, "Failed to encode metrics"),
    }

    process::exit(if success { 0 } else { 1 });
}
