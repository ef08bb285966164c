//! Status polling with bounded exponential backoff.
//!
//! The poller owns a job handle until the job reaches a terminal state, the
//! wait budget runs out, or the caller cancels. Time is read through
//! `tokio::time`, so a paused runtime clock drives it deterministically.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;
use tracing::{debug, info, warn};

use adx_core::config::IngestSettings;

use crate::cancel::CancelSignal;
use crate::client::{DataPlaneClient, IngestionJobHandle, JobStatus};
use crate::error::PollError;
use crate::outcome::{FailureKind, FailureReason, IngestionOutcome};

/// Backoff schedule between status queries.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Consecutive transient query failures tolerated before giving up.
    pub max_query_retries: u32,
    /// Upper bound of the random-ish delay added to every sleep.
    pub jitter: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_query_retries: 3,
            jitter: Duration::from_millis(100),
        }
    }
}

impl From<&IngestSettings> for PollPolicy {
    fn from(settings: &IngestSettings) -> Self {
        Self {
            initial_delay: Duration::from_millis(settings.poll_initial_ms),
            max_delay: Duration::from_millis(settings.poll_max_ms),
            multiplier: settings.poll_multiplier,
            max_query_retries: settings.poll_max_retries,
            ..Self::default()
        }
    }
}

impl PollPolicy {
    /// Same schedule without jitter, for reproducible timing.
    pub fn without_jitter(mut self) -> Self {
        self.jitter = Duration::ZERO;
        self
    }

    pub fn next_delay(&self, current: Duration) -> Duration {
        let grown = current.as_secs_f64() * self.multiplier.max(1.0);
        Duration::try_from_secs_f64(grown)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos() as u64)
            .unwrap_or(0);
        Duration::from_millis(nanos % (max_ms + 1))
    }
}

/// Terminal outcome for a status, or `None` while the job is still running.
pub fn outcome_for_status(status: &JobStatus) -> Option<IngestionOutcome> {
    let outcome = match status {
        JobStatus::Queued | JobStatus::Pending => return None,
        JobStatus::Succeeded => IngestionOutcome::Succeeded,
        JobStatus::PartiallySucceeded(detail) => {
            IngestionOutcome::failed(FailureKind::PartiallySucceeded, detail.clone())
        }
        JobStatus::Failed(detail) => IngestionOutcome::failed(FailureKind::IngestionFailed, detail.clone()),
        JobStatus::Skipped(detail) => IngestionOutcome::failed(FailureKind::IngestionSkipped, detail.clone()),
        JobStatus::Cancelled(detail) => IngestionOutcome::failed(
            FailureKind::IngestionFailed,
            format!("cancelled by the service: {detail}"),
        ),
    };
    Some(outcome)
}

pub struct StatusPoller {
    client: Arc<dyn DataPlaneClient>,
    policy: PollPolicy,
}

impl StatusPoller {
    pub fn new(client: Arc<dyn DataPlaneClient>, policy: PollPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll until the job finishes or `max_wait` elapses.
    pub async fn await_outcome(&self, handle: &IngestionJobHandle, max_wait: Duration) -> IngestionOutcome {
        self.await_cancellable(handle, max_wait, CancelSignal::never()).await
    }

    /// Like [`await_outcome`](Self::await_outcome), but stops as soon as
    /// `cancel` fires, including mid-sleep and mid-query. A status query
    /// still in flight at the deadline is abandoned.
    pub async fn await_cancellable(
        &self,
        handle: &IngestionJobHandle,
        max_wait: Duration,
        mut cancel: CancelSignal,
    ) -> IngestionOutcome {
        let start = Instant::now();
        let deadline = start + max_wait;
        let mut delay = self.policy.initial_delay;
        let mut attempts: u32 = 0;
        let mut consecutive_failures: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                info!(operation_id = %handle.operation_id, "Polling cancelled");
                return IngestionOutcome::Cancelled;
            }

            attempts += 1;
            let queried = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(operation_id = %handle.operation_id, "Polling cancelled during status query");
                    return IngestionOutcome::Cancelled;
                }
                result = self.client.query_status(handle) => result,
                _ = tokio::time::sleep_until(deadline) => {
                    let waited = start.elapsed();
                    warn!(
                        operation_id = %handle.operation_id,
                        waited_secs = waited.as_secs(),
                        "Status query still outstanding at the deadline"
                    );
                    return IngestionOutcome::TimedOut { waited };
                }
            };

            match queried {
                Ok(status) => {
                    consecutive_failures = 0;
                    debug!(
                        operation_id = %handle.operation_id,
                        status = ?status,
                        attempt = attempts,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Polled ingestion status"
                    );
                    if let Some(outcome) = outcome_for_status(&status) {
                        info!(
                            operation_id = %handle.operation_id,
                            outcome = %outcome,
                            attempts,
                            "Ingestion finished"
                        );
                        return outcome;
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    if !e.is_transient() || consecutive_failures > self.policy.max_query_retries {
                        let err = PollError::PollingUnavailable {
                            operation_id: handle.operation_id.clone(),
                            attempts: consecutive_failures,
                            source: e,
                        };
                        warn!(operation_id = %handle.operation_id, error = %err, "Giving up on status polling");
                        return IngestionOutcome::Failed(FailureReason::from(&err));
                    }
                    warn!(
                        operation_id = %handle.operation_id,
                        error = %e,
                        failures = consecutive_failures,
                        "Status query failed, retrying"
                    );
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= max_wait {
                warn!(
                    operation_id = %handle.operation_id,
                    waited_secs = elapsed.as_secs(),
                    "Ingestion still pending, wait budget exhausted"
                );
                return IngestionOutcome::TimedOut { waited: elapsed };
            }

            let sleep_for = (delay + self.policy.jitter()).min(max_wait - elapsed);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(operation_id = %handle.operation_id, "Polling cancelled while waiting");
                    return IngestionOutcome::Cancelled;
                }
                _ = tokio::time::sleep(sleep_for) => {}
            }
            delay = self.policy.next_delay(delay);
        }
    }
}
