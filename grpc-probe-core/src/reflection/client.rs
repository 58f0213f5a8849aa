//! # Reflection Client
//!
//! Speaks `grpc.reflection.v1` over a single bidirectional stream.
//!
//! [`ReflectionClient::file_descriptor_set_by_symbol`] asks for the file declaring a symbol,
//! then keeps asking for every import it has not seen yet until nothing is pending. The
//! result is a self-contained `FileDescriptorSet` that a `DescriptorPool` can load.
//!
//! ## References
//!
//! * [gRPC Server Reflection Protocol](https://github.com/grpc/grpc/blob/master/doc/server-reflection.md)
use crate::BoxError;
use http_body::Body as HttpBody;
use prost::Message;
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tonic::{Streaming, client::GrpcService};
use tonic_reflection::pb::v1::{
    FileDescriptorResponse, ServerReflectionRequest, ServerReflectionResponse,
    server_reflection_client::ServerReflectionClient, server_reflection_request::MessageRequest,
    server_reflection_response::MessageResponse,
};

/// Failures of the reflection exchange itself.
#[derive(Debug, thiserror::Error)]
pub enum ReflectionResolveError {
    #[error("Could not open the reflection stream, reflection might not be supported: '{0}'")]
    StreamOpen(#[source] tonic::Status),

    #[error("Reflection stream failed: '{0}'")]
    StreamStatus(#[source] tonic::Status),

    #[error("Reflection stream ended with {0} request(s) unanswered")]
    StreamClosed(usize),

    #[error("Reflection stream stopped accepting requests")]
    RequestDropped,

    #[error("Reflection server answered with error {code}: {message}")]
    ServerError { code: i32, message: String },

    #[error("Unexpected reflection response: {0}")]
    UnexpectedResponse(String),

    #[error("Malformed file descriptor: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Outgoing requests buffered before the server reads them.
const REQUEST_BUFFER: usize = 32;

/// Client for the gRPC Server Reflection Protocol.
#[derive(Debug, Clone)]
pub struct ReflectionClient<T = Channel> {
    client: ServerReflectionClient<T>,
}

impl<S> ReflectionClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        Self {
            client: ServerReflectionClient::new(service),
        }
    }

    /// Fetches the file declaring `symbol` (e.g. `my.package.MyService`) together with all
    /// of its transitive imports.
    ///
    /// An unknown symbol surfaces as [`ReflectionResolveError::StreamStatus`] with code
    /// `NOT_FOUND` or as a [`ReflectionResolveError::ServerError`] carrying that code,
    /// depending on the server.
    pub async fn file_descriptor_set_by_symbol(
        &mut self,
        symbol: &str,
    ) -> Result<FileDescriptorSet, ReflectionResolveError> {
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);

        let responses = self
            .client
            .server_reflection_info(ReceiverStream::new(rx))
            .await
            .map_err(ReflectionResolveError::StreamOpen)?
            .into_inner();

        let mut collector = Collector::new(tx);
        collector
            .request(MessageRequest::FileContainingSymbol(symbol.to_string()))
            .await?;
        collector.drain(responses).await
    }
}

/// Tracks what was asked for and what came back on one reflection stream.
struct Collector {
    tx: mpsc::Sender<ServerReflectionRequest>,
    files: BTreeMap<String, FileDescriptorProto>,
    seen: HashSet<String>,
    pending: usize,
}

impl Collector {
    fn new(tx: mpsc::Sender<ServerReflectionRequest>) -> Self {
        Self {
            tx,
            files: BTreeMap::new(),
            seen: HashSet::new(),
            pending: 0,
        }
    }

    async fn request(&mut self, message: MessageRequest) -> Result<(), ReflectionResolveError> {
        let request = ServerReflectionRequest {
            // Servers ignore the host field.
            host: String::new(),
            message_request: Some(message),
        };

        self.tx
            .send(request)
            .await
            .map_err(|_| ReflectionResolveError::RequestDropped)?;
        self.pending += 1;
        Ok(())
    }

    async fn drain(
        mut self,
        mut responses: Streaming<ServerReflectionResponse>,
    ) -> Result<FileDescriptorSet, ReflectionResolveError> {
        while self.pending > 0 {
            let response = responses
                .message()
                .await
                .map_err(ReflectionResolveError::StreamStatus)?
                .ok_or(ReflectionResolveError::StreamClosed(self.pending))?;

            self.pending -= 1;

            match response.message_response {
                Some(MessageResponse::FileDescriptorResponse(batch)) => self.accept(batch).await?,
                Some(MessageResponse::ErrorResponse(e)) => {
                    return Err(ReflectionResolveError::ServerError {
                        code: e.error_code,
                        message: e.error_message,
                    });
                }
                Some(other) => {
                    return Err(ReflectionResolveError::UnexpectedResponse(format!(
                        "{other:?}"
                    )));
                }
                None => {
                    return Err(ReflectionResolveError::UnexpectedResponse(
                        "empty response".to_string(),
                    ));
                }
            }
        }

        Ok(FileDescriptorSet {
            file: self.files.into_values().collect(),
        })
    }

    /// Stores every new file of a batch and asks for the imports nobody asked for yet.
    ///
    /// Servers may push imports along with the requested file; those count as seen.
    async fn accept(
        &mut self,
        batch: FileDescriptorResponse,
    ) -> Result<(), ReflectionResolveError> {
        let mut fresh = Vec::new();

        for raw in batch.file_descriptor_proto {
            let file = FileDescriptorProto::decode(raw.as_slice())?;
            let name = file.name().to_string();

            if self.files.contains_key(&name) {
                continue;
            }
            self.seen.insert(name.clone());
            fresh.push(file.dependency.clone());
            self.files.insert(name, file);
        }

        for import in fresh.into_iter().flatten() {
            if !self.files.contains_key(&import) && self.seen.insert(import.clone()) {
                self.request(MessageRequest::FileByFilename(import)).await?;
            }
        }

        Ok(())
    }
}
