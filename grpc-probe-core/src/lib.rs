//! # gRPC Probe Core
//!
//! `grpc-probe-core` checks that a remote gRPC endpoint is reachable and answers a given
//! unary method correctly, without compile-time knowledge of the endpoint's Protobuf schema.
//!
//! The schema is discovered at probe time through the gRPC Server Reflection Protocol, a
//! default-valued request is built from the discovered message type, the method is invoked,
//! and the textual form of the response can optionally be compared against an expected value.
//!
//! ## Key Components
//!
//! * **[`probe_grpc`]:** The main entry point. Dials the target over TLS, runs the probe
//!   pipeline and records the `grpc_probe_success` gauge on the caller's registry.
//! * **[`GrpcProber`]:** The pipeline itself, usable over any tonic service when the caller
//!   wants the typed [`ProbeError`] instead of a boolean.
//! * **[`ProbeSpec`]:** What to probe (service, method, message type, expected response).
//! * **[`ProbeContext`]:** Cancellation token and deadline threaded through every network step.
//!
//! ## Internal clients
//!
//! * **[`ReflectionClient`](reflection::client::ReflectionClient):** Fetches the file containing
//!   a symbol plus its transitive imports from the server's reflection service.
//! * **[`GrpcClient`](grpc::client::GrpcClient):** Issues unary calls with `DynamicMessage`
//!   payloads through a custom codec.
//!
//! ## Re-exports
//!
//! This crate re-exports `prometheus`, `prost-reflect`, and `tonic` to ensure that consumers
//! use compatible versions of these underlying dependencies.
pub mod config;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod grpc;
pub mod metrics;
pub mod probe;
pub mod reflection;
pub mod transport;
pub mod validate;

pub use config::ProbeSpec;
pub use context::{Interruption, ProbeContext};
pub use error::{ProbeError, ProbeStage};
pub use probe::{GrpcProber, probe_grpc, probe_service};

// Re-exports
pub use prometheus;
pub use prost_reflect;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
