//! # Test Service
//!
//! **INTERNAL USE ONLY**: This crate exists solely to provide gRPC server definitions and
//! their descriptor set for integration testing the probe.
//! It is not intended for production use.

pub mod echo {
    include!(concat!(env!("OUT_DIR"), "/echo.rs"));
}

pub mod health {
    include!(concat!(env!("OUT_DIR"), "/grpc.health.v1.rs"));
}

pub use echo::echo_service_server::{EchoService, EchoServiceServer};
pub use health::health_server::{Health, HealthServer};
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("descriptors");
