use grpc_probe_core::prometheus::{Encoder, Registry, TextEncoder};
use grpc_probe_core::prost_reflect::{DescriptorPool, DynamicMessage, Value};
use std::time::Duration;
use test_service::echo::{EchoRequest, EchoResponse};
use test_service::health::{
    HealthCheckRequest, HealthCheckResponse, health_check_response::ServingStatus,
};
use test_service::{EchoService, EchoServiceServer, FILE_DESCRIPTOR_SET, Health, HealthServer};
use tokio_stream::wrappers::ReceiverStream;
use tonic::service::Routes;
use tonic::{Request, Response, Status};

pub struct EchoServiceImpl;

#[tonic::async_trait]
impl EchoService for EchoServiceImpl {
    type ServerStreamingEchoStream = ReceiverStream<Result<EchoResponse, Status>>;

    async fn unary_echo(
        &self,
        request: Request<EchoRequest>,
    ) -> Result<Response<EchoResponse>, Status> {
        let message = format!("echo: {}", request.into_inner().message);
        Ok(Response::new(EchoResponse { message }))
    }

    async fn failing_echo(
        &self,
        _request: Request<EchoRequest>,
    ) -> Result<Response<EchoResponse>, Status> {
        Err(Status::unavailable("echo is down"))
    }

    async fn slow_echo(
        &self,
        _request: Request<EchoRequest>,
    ) -> Result<Response<EchoResponse>, Status> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Response::new(EchoResponse {
            message: "too late".to_string(),
        }))
    }

    async fn server_streaming_echo(
        &self,
        request: Request<EchoRequest>,
    ) -> Result<Response<Self::ServerStreamingEchoStream>, Status> {
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let message = request.into_inner().message;
        tokio::spawn(async move {
            let _ = tx.send(Ok(EchoResponse { message })).await;
        });
        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

pub struct HealthImpl {
    status: ServingStatus,
}

#[tonic::async_trait]
impl Health for HealthImpl {
    type WatchStream = ReceiverStream<Result<HealthCheckResponse, Status>>;

    async fn check(
        &self,
        _request: Request<HealthCheckRequest>,
    ) -> Result<Response<HealthCheckResponse>, Status> {
        Ok(Response::new(HealthCheckResponse {
            status: self.status as i32,
        }))
    }

    async fn watch(
        &self,
        _request: Request<HealthCheckRequest>,
    ) -> Result<Response<Self::WatchStream>, Status> {
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let status = self.status as i32;
        tokio::spawn(async move {
            let _ = tx.send(Ok(HealthCheckResponse { status })).await;
        });
        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

/// Reflection, echo and health services behind one in-process router.
pub fn routes(health: ServingStatus) -> Routes {
    let reflection_service = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()
        .expect("Failed to setup Reflection Service");

    Routes::new(reflection_service)
        .add_service(EchoServiceServer::new(EchoServiceImpl))
        .add_service(HealthServer::new(HealthImpl { status: health }))
}

/// The text a healthy `Check` response renders to.
pub fn health_response_text(status: ServingStatus) -> String {
    let pool = DescriptorPool::decode(FILE_DESCRIPTOR_SET).unwrap();
    let descriptor = pool
        .get_message_by_name("grpc.health.v1.HealthCheckResponse")
        .unwrap();

    let mut message = DynamicMessage::new(descriptor);
    message.set_field_by_name("status", Value::EnumNumber(status as i32));
    message.to_string()
}

/// Reads `grpc_probe_success` back from the registry's text exposition.
pub fn probe_success(registry: &Registry) -> Option<f64> {
    let mut buf = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buf)
        .unwrap();

    String::from_utf8(buf)
        .unwrap()
        .lines()
        .find_map(|line| line.strip_prefix("grpc_probe_success "))
        .map(|value| value.trim().parse().unwrap())
}
