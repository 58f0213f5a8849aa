//! # Generic gRPC Client
//!
//! This module wraps a standard `tonic` client to issue unary calls whose request and
//! response types are only known at runtime.
//!
//! The [`GrpcClient`] builds the HTTP/2 path (e.g. `/package.Service/Method`) from the
//! `MethodDescriptor` and hands the [`DynamicMessage`] to the
//! [`DynamicCodec`](super::codec::DynamicCodec), which decodes the reply with the method's
//! output descriptor.
use super::codec::DynamicCodec;
use crate::BoxError;
use http_body::Body as HttpBody;
use prost_reflect::{DynamicMessage, MethodDescriptor, ReflectMessage};
use std::str::FromStr;
use tonic::{client::GrpcService, transport::Channel};

/// Errors that can occur while invoking the probed method.
#[derive(thiserror::Error, Debug)]
pub enum InvocationError {
    #[error("Internal error, the client was not ready: '{0}'")]
    ClientNotReady(#[source] BoxError),
    #[error("Method '{0}' is a streaming method, only unary methods can be probed")]
    StreamingNotSupported(String),
    #[error("Request message type '{actual}' does not match the input type '{expected}' of the method")]
    RequestTypeMismatch { expected: String, actual: String },
    #[error("Invalid gRPC path '{0}'")]
    InvalidPath(String),
    #[error("The server returned an error status: '{0}'")]
    Status(#[from] tonic::Status),
}

/// A generic client performing unary calls with dynamic messages.
#[derive(Debug, Clone)]
pub struct GrpcClient<S = Channel> {
    client: tonic::client::Grpc<S>,
}

impl<S> GrpcClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        let client = tonic::client::Grpc::new(service);
        Self { client }
    }

    /// Performs a Unary gRPC call (Single Request -> Single Response).
    ///
    /// The request must be an instance of the method's input type.
    ///
    /// # Returns
    /// * `Ok(DynamicMessage)` - The decoded response.
    /// * `Err(InvocationError)` - The call could not be made, or the server answered with a
    ///   non-OK status.
    pub async fn unary(
        &mut self,
        method: &MethodDescriptor,
        request: DynamicMessage,
    ) -> Result<DynamicMessage, InvocationError> {
        if method.is_client_streaming() || method.is_server_streaming() {
            return Err(InvocationError::StreamingNotSupported(
                method.full_name().to_string(),
            ));
        }

        let input = method.input();
        if request.descriptor() != input {
            return Err(InvocationError::RequestTypeMismatch {
                expected: input.full_name().to_string(),
                actual: request.descriptor().full_name().to_string(),
            });
        }

        let path = http_path(method)?;

        self.client
            .ready()
            .await
            .map_err(|e| InvocationError::ClientNotReady(e.into()))?;

        let codec = DynamicCodec::new(method.output());
        let response = self
            .client
            .unary(tonic::Request::new(request), path, codec)
            .await?;

        Ok(response.into_inner())
    }
}

fn http_path(method: &MethodDescriptor) -> Result<http::uri::PathAndQuery, InvocationError> {
    let path = format!("/{}/{}", method.parent_service().full_name(), method.name());
    http::uri::PathAndQuery::from_str(&path).map_err(|_| InvocationError::InvalidPath(path))
}
