//! Wait-for-completion primitive for long-running provider operations
//!
//! Every create call in the migration returns immediately with a resource id;
//! the resource then moves through provisioning states on the provider side.
//! [`OperationPoller::wait`] polls a status-fetch function on a growing delay
//! schedule until one of three things happens:
//!
//! ```text
//! fetch ──► Failed/Canceled ──► OperationFailed (raised immediately)
//!   │
//!   ├───► ready per Readiness ─► Ok(status)
//!   │
//!   ├───► throttled/transient ─► logged, polled again on the same schedule
//!   │
//!   └───► elapsed ≥ timeout ───► Timeout (carries the last observed state)
//! ```
//!
//! A failed status *read* is not a failed operation: retryable read errors keep
//! the wait going, anything else aborts it. The poller never retries a failed
//! operation itself; retry policy belongs to the caller.

use crate::backoff::Backoff;
use crate::error::{OrchestratorError, Result};
use rezone_core::{ComputeProvider, OperationStatus, ProviderError, ProvisioningState, ResourceId};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Snapshot access states that allow reading the copy
pub const FAST_READABLE_STATES: [&str; 3] =
    ["InstantAccess", "AvailableWithInstantAccess", "Available"];

/// Readiness predicate selected per call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Provisioning state is `Succeeded`
    Provisioned,

    /// Provisioning state is `Succeeded` and the secondary state is one of these
    /// (case-insensitive)
    ProvisionedWith(Vec<String>),
}

impl Readiness {
    /// Provisioned and the copy is readable (instant access or fully durable)
    pub fn fast_readable() -> Self {
        Self::ProvisionedWith(FAST_READABLE_STATES.iter().map(|s| s.to_string()).collect())
    }

    /// Provisioned and in one of the given secondary states
    pub fn with_states<I, S>(states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ProvisionedWith(states.into_iter().map(Into::into).collect())
    }

    /// Evaluate the predicate against an observed status
    pub fn is_ready(&self, status: &OperationStatus) -> bool {
        if !status.provisioning_state.is_succeeded() {
            return false;
        }

        match self {
            Self::Provisioned => true,
            Self::ProvisionedWith(accepted) => status
                .secondary_state
                .as_deref()
                .is_some_and(|state| accepted.iter().any(|a| a.eq_ignore_ascii_case(state))),
        }
    }
}

/// Polls long-running operations to completion
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationPoller {
    backoff: Backoff,
}

impl OperationPoller {
    /// Create a poller with a custom delay schedule
    pub fn new(backoff: Backoff) -> Self {
        Self { backoff }
    }

    /// Delay schedule in use
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Poll `fetch` until the operation is ready, fails, or `timeout` elapses
    ///
    /// The final sleep is clamped to the remaining budget, so a never-resolving
    /// operation is reported exactly at the timeout boundary.
    pub async fn wait<F, Fut>(
        &self,
        resource: &str,
        readiness: &Readiness,
        timeout: Duration,
        mut fetch: F,
    ) -> Result<OperationStatus>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<OperationStatus>>,
    {
        let start = Instant::now();
        let mut attempt = 0u32;
        let mut last_status: Option<OperationStatus> = None;
        let mut last_error: Option<ProviderError> = None;

        debug!(
            resource = %resource,
            timeout_secs = timeout.as_secs_f64(),
            readiness = ?readiness,
            "Waiting for operation"
        );

        loop {
            match fetch().await {
                Ok(status) => {
                    if status.provisioning_state.is_failed() {
                        return Err(OrchestratorError::OperationFailed {
                            resource: resource.to_string(),
                            status,
                        });
                    }

                    if readiness.is_ready(&status) {
                        info!(
                            resource = %resource,
                            status = %status,
                            elapsed_secs = start.elapsed().as_secs_f64(),
                            "Operation completed"
                        );
                        return Ok(status);
                    }

                    debug!(resource = %resource, status = %status, "Operation still in progress");
                    last_status = Some(status);
                }
                Err(OrchestratorError::Provider(e)) if e.is_retryable() => {
                    warn!(resource = %resource, error = %e, "Status read failed, polling again");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(match (last_status, last_error) {
                    (None, Some(e)) => OrchestratorError::Provider(e),
                    (status, _) => OrchestratorError::Timeout {
                        resource: resource.to_string(),
                        timeout,
                        last_status: status
                            .unwrap_or_else(|| OperationStatus::new(ProvisioningState::Unknown)),
                    },
                });
            }

            let delay = self.backoff.delay_for(attempt).min(timeout - elapsed);
            debug!(
                resource = %resource,
                next_poll_secs = delay.as_secs_f64(),
                "Sleeping before next poll"
            );

            tokio::time::sleep(delay).await;
            attempt = attempt.saturating_add(1);
        }
    }

    /// Poll a provider resource through `get_operation_status`
    pub async fn wait_for(
        &self,
        provider: &dyn ComputeProvider,
        id: &ResourceId,
        readiness: &Readiness,
        timeout: Duration,
    ) -> Result<OperationStatus> {
        self.wait(id.name(), readiness, timeout, || async move {
            provider
                .get_operation_status(id)
                .await
                .map_err(OrchestratorError::from)
        })
        .await
    }
}
