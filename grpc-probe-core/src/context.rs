//! # Probe Context
//!
//! A [`ProbeContext`] carries the cancellation token and the optional deadline of one probe.
//! Every network step of the pipeline runs through [`ProbeContext::guard`], so cancelling
//! the token or reaching the deadline drops the in-flight future instead of waiting on it.
use std::{fmt, future::Future, time::Duration};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a guarded step stopped before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    /// The cancellation token was triggered.
    Cancelled,
    /// The deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for Interruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interruption::Cancelled => f.write_str("cancelled"),
            Interruption::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProbeContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl ProbeContext {
    /// A context that is never cancelled and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context whose deadline is `timeout` from now.
    ///
    /// A timeout too large to be represented as an instant leaves the context without a deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::default().deadline(deadline),
            None => Self::default(),
        }
    }

    /// Replaces the cancellation token, so the caller can cancel the probe from outside.
    pub fn cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sets an absolute deadline.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Runs `fut` until it completes, the token is cancelled, or the deadline passes.
    ///
    /// Cancellation is checked first, so an already cancelled context never polls `fut`.
    pub async fn guard<F>(&self, fut: F) -> Result<F::Output, Interruption>
    where
        F: Future,
    {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interruption::Cancelled),
            _ = deadline => Err(Interruption::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guard_returns_output_when_future_completes() {
        let ctx = ProbeContext::with_timeout(Duration::from_secs(5));
        assert_eq!(ctx.guard(async { 42 }).await, Ok(42));
    }

    #[tokio::test]
    async fn unrepresentable_timeout_means_no_deadline() {
        let ctx = ProbeContext::with_timeout(Duration::MAX);

        assert!(ctx.deadline.is_none());
        assert_eq!(ctx.guard(async { 42 }).await, Ok(42));
    }

    #[tokio::test]
    async fn guard_reports_cancellation() {
        let ctx = ProbeContext::new();
        ctx.token().cancel();

        let result = ctx.guard(async { 42 }).await;
        assert_eq!(result, Err(Interruption::Cancelled));
    }

    #[tokio::test]
    async fn guard_reports_deadline() {
        let ctx = ProbeContext::with_timeout(Duration::from_millis(20));

        let result = ctx
            .guard(tokio::time::sleep(Duration::from_secs(10)))
            .await;
        assert_eq!(result, Err(Interruption::DeadlineExceeded));
    }

    #[tokio::test]
    async fn cancelling_from_outside_aborts_pending_step() {
        let token = CancellationToken::new();
        let ctx = ProbeContext::new().cancellation_token(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let result = ctx.guard(std::future::pending::<()>()).await;
        assert_eq!(result, Err(Interruption::Cancelled));
        canceller.await.unwrap();
    }
}
