//! # Server Reflection
//!
//! This module contains the logic necessary to interact with the gRPC Server Reflection Protocol.
//!
//! It lets the probe ask the target for its own Protobuf schema at runtime: the file that
//! declares the probed service, and the service descriptor itself.
pub mod client;

use crate::BoxError;
use client::{ReflectionClient, ReflectionResolveError};
use http_body::Body as HttpBody;
use prost_reflect::{DescriptorError, DescriptorPool, FileDescriptor, ServiceDescriptor};
use tonic::{Code, client::GrpcService};

/// Errors that can occur while resolving the probed service through reflection.
#[derive(Debug, thiserror::Error)]
pub enum ReflectionError {
    #[error("Reflection resolution failed: '{0}'")]
    ReflectionResolve(#[from] ReflectionResolveError),
    #[error("Failed to decode file descriptor set: '{0}'")]
    DescriptorError(#[from] DescriptorError),
    #[error("Symbol '{0}' not found")]
    SymbolNotFound(String),
    #[error("Symbol '{0}' is not a service")]
    NotAService(String),
}

/// The schema of the probed service, as reported by the target.
#[derive(Debug, Clone)]
pub struct ResolvedService {
    /// The file declaring the service. Its top-level messages are the candidate request types.
    pub file: FileDescriptor,
    pub service: ServiceDescriptor,
}

/// Fetches the file containing `symbol` and resolves `symbol` as a service inside it.
///
/// The descriptors live in a fresh [`DescriptorPool`] owned by the returned value.
pub async fn resolve_service<S>(
    client: &mut ReflectionClient<S>,
    symbol: &str,
) -> Result<ResolvedService, ReflectionError>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    let fd_set = client
        .file_descriptor_set_by_symbol(symbol)
        .await
        .map_err(|err| match err {
            ReflectionResolveError::StreamStatus(status)
                if status.code() == Code::NotFound =>
            {
                ReflectionError::SymbolNotFound(symbol.to_string())
            }
            ReflectionResolveError::ServerError { code, .. } if code == Code::NotFound as i32 => {
                ReflectionError::SymbolNotFound(symbol.to_string())
            }
            err => ReflectionError::ReflectionResolve(err),
        })?;

    let pool = DescriptorPool::from_file_descriptor_set(fd_set)?;

    service_in_pool(&pool, symbol)
}

fn service_in_pool(pool: &DescriptorPool, symbol: &str) -> Result<ResolvedService, ReflectionError> {
    if let Some(service) = pool.get_service_by_name(symbol) {
        return Ok(ResolvedService {
            file: service.parent_file(),
            service,
        });
    }

    if pool.get_message_by_name(symbol).is_some() || pool.get_enum_by_name(symbol).is_some() {
        return Err(ReflectionError::NotAService(symbol.to_string()));
    }

    Err(ReflectionError::SymbolNotFound(symbol.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::{
        DescriptorProto, FileDescriptorProto, FileDescriptorSet, MethodDescriptorProto,
        ServiceDescriptorProto,
    };

    fn pool() -> DescriptorPool {
        let file = FileDescriptorProto {
            name: Some("ping.proto".to_string()),
            package: Some("ping".to_string()),
            syntax: Some("proto3".to_string()),
            message_type: vec![DescriptorProto {
                name: Some("PingRequest".to_string()),
                ..Default::default()
            }],
            service: vec![ServiceDescriptorProto {
                name: Some("Pinger".to_string()),
                method: vec![MethodDescriptorProto {
                    name: Some("Ping".to_string()),
                    input_type: Some(".ping.PingRequest".to_string()),
                    output_type: Some(".ping.PingRequest".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };

        DescriptorPool::from_file_descriptor_set(FileDescriptorSet { file: vec![file] }).unwrap()
    }

    #[test]
    fn resolves_service_and_its_file() {
        let resolved = service_in_pool(&pool(), "ping.Pinger").unwrap();

        assert_eq!(resolved.service.full_name(), "ping.Pinger");
        assert_eq!(resolved.file.name(), "ping.proto");
    }

    #[test]
    fn message_symbol_is_not_a_service() {
        assert!(matches!(
            service_in_pool(&pool(), "ping.PingRequest"),
            Err(ReflectionError::NotAService(name)) if name == "ping.PingRequest"
        ));
    }

    #[test]
    fn unknown_symbol_is_not_found() {
        assert!(matches!(
            service_in_pool(&pool(), "ping.Ghost"),
            Err(ReflectionError::SymbolNotFound(name)) if name == "ping.Ghost"
        ));
    }
}
