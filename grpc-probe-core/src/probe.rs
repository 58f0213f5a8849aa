//! # gRPC Probe
//!
//! This module runs the probe pipeline:
//!
//! `Dial → ResolveFile&Symbol → ResolveMethod → ResolveMessageType → BuildMessage → Invoke →
//! ValidateResponse → Report`
//!
//! Each step either hands its result to the next one or ends the probe with a
//! [`ProbeError`]. Nothing is retried and nothing is cached between probes: every probe
//! fetches its descriptors again and owns its own connection, which is closed when the
//! [`GrpcProber`] is dropped.
//!
//! ## Example
//!
//! ```rust,no_run
//! use grpc_probe_core::{ProbeContext, ProbeSpec, probe_grpc, prometheus::Registry};
//! use std::time::Duration;
//!
//! # async fn run() {
//! let spec = ProbeSpec {
//!     service: "grpc.health.v1.Health".to_string(),
//!     method: "Check".to_string(),
//!     message_type: "HealthCheckRequest".to_string(),
//!     ..Default::default()
//! };
//! let registry = Registry::new();
//! let ctx = ProbeContext::with_timeout(Duration::from_secs(5));
//!
//! let healthy = probe_grpc("localhost:50051", &spec, &registry, &ctx).await;
//! # }
//! ```
use crate::{
    BoxError,
    config::ProbeSpec,
    context::ProbeContext,
    descriptor::{build_default_message, resolve_message_type, resolve_method},
    error::{ProbeError, ProbeStage},
    grpc::client::GrpcClient,
    metrics::ProbeMetrics,
    reflection::{self, client::ReflectionClient},
    transport,
    validate::validate_response,
};
use http_body::Body as HttpBody;
use prometheus::Registry;
use prost_reflect::DynamicMessage;
use tonic::{client::GrpcService, transport::Channel};

/// Probes `target` as described by `spec`.
///
/// Registers `grpc_probe_success` on `registry` and sets it to 1 when the probe succeeds.
/// Every failure is logged and reported as `false`.
pub async fn probe_grpc(
    target: &str,
    spec: &ProbeSpec,
    registry: &Registry,
    ctx: &ProbeContext,
) -> bool {
    let metrics = match ProbeMetrics::register(registry) {
        Ok(metrics) => metrics,
        Err(err) => return report(target, spec, Err(err.into()), None),
    };

    let outcome = match GrpcProber::connect(target, spec.insecure_skip_verify, ctx).await {
        Ok(mut prober) => prober.run(spec, ctx).await,
        Err(err) => Err(err),
    };

    report(target, spec, outcome, Some(&metrics))
}

/// Probes an already connected tonic service as described by `spec`.
///
/// Behaves like [`probe_grpc`] minus the dial step; `spec.insecure_skip_verify` is ignored.
pub async fn probe_service<S>(
    service: S,
    spec: &ProbeSpec,
    registry: &Registry,
    ctx: &ProbeContext,
) -> bool
where
    S: GrpcService<tonic::body::Body> + Clone,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    const IN_PROCESS: &str = "<service>";

    let metrics = match ProbeMetrics::register(registry) {
        Ok(metrics) => metrics,
        Err(err) => return report(IN_PROCESS, spec, Err(err.into()), None),
    };

    let outcome = GrpcProber::from_service(service).run(spec, ctx).await;

    report(IN_PROCESS, spec, outcome, Some(&metrics))
}

fn report(
    target: &str,
    spec: &ProbeSpec,
    outcome: Result<DynamicMessage, ProbeError>,
    metrics: Option<&ProbeMetrics>,
) -> bool {
    match outcome {
        Ok(_) => {
            if let Some(metrics) = metrics {
                metrics.record_success();
            }
            tracing::debug!(
                address = %target,
                service = %spec.service,
                method = %spec.method,
                "gRPC probe succeeded"
            );
            true
        }
        Err(err @ (ProbeError::Connection(_) | ProbeError::Metrics(_))) => {
            tracing::error!(address = %target, error = %err, "Failed to run gRPC probe");
            false
        }
        Err(err) => {
            tracing::info!(
                address = %target,
                service = %spec.service,
                method = %spec.method,
                error = %err,
                "gRPC probe failed"
            );
            false
        }
    }
}

/// The probe pipeline over one connection.
///
/// The generic parameter `S` is the underlying transport, a [`Channel`] when created with
/// [`GrpcProber::connect`].
#[derive(Debug, Clone)]
pub struct GrpcProber<S = Channel> {
    reflection_client: ReflectionClient<S>,
    grpc_client: GrpcClient<S>,
}

impl GrpcProber<Channel> {
    /// Dials `target` over TLS.
    ///
    /// # Returns
    ///
    /// * `Ok(GrpcProber)` - The connected prober.
    /// * `Err(ProbeError::Connection)` - The target is invalid or the dial failed.
    /// * `Err(ProbeError::Interrupted)` - The context was cancelled or timed out while dialing.
    pub async fn connect(
        target: &str,
        insecure_skip_verify: bool,
        ctx: &ProbeContext,
    ) -> Result<Self, ProbeError> {
        let channel = ctx
            .guard(transport::connect(target, insecure_skip_verify))
            .await
            .map_err(ProbeError::interrupted(ProbeStage::Dial))??;

        Ok(Self::from_service(channel))
    }
}

impl<S> GrpcProber<S>
where
    S: GrpcService<tonic::body::Body> + Clone,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    /// Creates a prober from an existing Tonic service/channel.
    pub fn from_service(service: S) -> Self {
        let reflection_client = ReflectionClient::new(service.clone());
        let grpc_client = GrpcClient::new(service);
        Self {
            reflection_client,
            grpc_client,
        }
    }

    /// Runs every step after the dial and returns the validated response.
    pub async fn run(
        &mut self,
        spec: &ProbeSpec,
        ctx: &ProbeContext,
    ) -> Result<DynamicMessage, ProbeError> {
        let resolved = ctx
            .guard(reflection::resolve_service(
                &mut self.reflection_client,
                &spec.service,
            ))
            .await
            .map_err(ProbeError::interrupted(ProbeStage::Reflection))??;

        let method = resolve_method(&resolved, &spec.method)
            .ok_or_else(|| ProbeError::MethodNotFound(spec.method.clone()))?;

        let message_type = resolve_message_type(&resolved, &spec.message_type)
            .ok_or_else(|| ProbeError::MessageTypeNotFound(spec.message_type.clone()))?;

        let request = build_default_message(message_type);

        let response = ctx
            .guard(self.grpc_client.unary(&method, request))
            .await
            .map_err(ProbeError::interrupted(ProbeStage::Invoke))??;

        validate_response(&response, &spec.response_message)?;

        Ok(response)
    }
}
