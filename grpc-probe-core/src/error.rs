//! # Probe Errors
//!
//! Every way a probe can fail. None of them escape the pipeline: [`crate::probe_grpc`]
//! logs the error and turns it into `false`.
use crate::{
    context::Interruption, grpc::client::InvocationError, reflection::ReflectionError,
    transport::ConnectError,
};
use std::fmt;

/// The network step that was running when a probe was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStage {
    Dial,
    Reflection,
    Invoke,
}

impl fmt::Display for ProbeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStage::Dial => f.write_str("dial"),
            ProbeStage::Reflection => f.write_str("reflection"),
            ProbeStage::Invoke => f.write_str("invoke"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Failed to register probe metrics: '{0}'")]
    Metrics(#[from] prometheus::Error),

    #[error("Failed to create gRPC connection: '{0}'")]
    Connection(#[from] ConnectError),

    #[error("Failed to get gRPC file descriptor: '{0}'")]
    Reflection(#[from] ReflectionError),

    #[error("Method {0} is not found")]
    MethodNotFound(String),

    #[error("Message descriptor {0} is not found")]
    MessageTypeNotFound(String),

    #[error("gRPC invocation failed: '{0}'")]
    Invocation(#[from] InvocationError),

    #[error("Response message {actual} != {expected}")]
    ResponseMismatch { actual: String, expected: String },

    #[error("Probe {cause} during {stage}")]
    Interrupted {
        stage: ProbeStage,
        cause: Interruption,
    },
}

impl ProbeError {
    pub(crate) fn interrupted(stage: ProbeStage) -> impl FnOnce(Interruption) -> Self {
        move |cause| ProbeError::Interrupted { stage, cause }
    }

    /// Returns `true` when the probe ran out of time, as opposed to being rejected.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ProbeError::Interrupted {
                cause: Interruption::DeadlineExceeded,
                ..
            }
        )
    }

    /// Returns `true` when the probe was cancelled by the caller.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ProbeError::Interrupted {
                cause: Interruption::Cancelled,
                ..
            }
        )
    }
}
