//! Provision → submit → wait, as one operation with one outcome.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{info, warn};

use adx_core::{Config, IngestionMapping, SchemaDefinition, SourceLocation};

use crate::cancel::{cancel_pair, CancelHandle, CancelSignal};
use crate::client::{ControlPlaneClient, DataPlaneClient};
use crate::outcome::{FailureKind, FailureReason, IngestionOutcome};
use crate::poll::{PollPolicy, StatusPoller};
use crate::provision::{ProvisionMode, SchemaProvisioner};
use crate::submit::IngestionSubmitter;

/// Everything an orchestrator needs besides its clients.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub database: String,
    pub provision_mode: ProvisionMode,
    pub poll_policy: PollPolicy,
    pub tags: Vec<String>,
}

impl OrchestratorConfig {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            provision_mode: ProvisionMode::Reset,
            poll_policy: PollPolicy::default(),
            tags: Vec::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            database: config.cluster.database.clone(),
            provision_mode: if config.ingest.reset_table {
                ProvisionMode::Reset
            } else {
                ProvisionMode::Merge
            },
            poll_policy: PollPolicy::from(&config.ingest),
            tags: Vec::new(),
        }
    }
}

pub struct IngestionOrchestrator {
    provisioner: SchemaProvisioner,
    submitter: IngestionSubmitter,
    poller: StatusPoller,
}

impl IngestionOrchestrator {
    pub fn new(
        control: Arc<dyn ControlPlaneClient>,
        data: Arc<dyn DataPlaneClient>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            provisioner: SchemaProvisioner::new(control, config.database.clone(), config.provision_mode),
            submitter: IngestionSubmitter::new(data.clone(), config.database).with_tags(config.tags),
            poller: StatusPoller::new(data, config.poll_policy),
        }
    }

    pub async fn run(
        &self,
        schema: &SchemaDefinition,
        mapping: &IngestionMapping,
        source: &SourceLocation,
        max_wait: Duration,
    ) -> IngestionOutcome {
        self.run_cancellable(schema, mapping, source, max_wait, CancelSignal::never())
            .await
    }

    /// Cancellation is checked between steps and observed throughout polling.
    pub async fn run_cancellable(
        &self,
        schema: &SchemaDefinition,
        mapping: &IngestionMapping,
        source: &SourceLocation,
        max_wait: Duration,
        cancel: CancelSignal,
    ) -> IngestionOutcome {
        let table = schema.table();
        info!(
            table = %table,
            mapping = %mapping.name(),
            source = %source,
            max_wait_secs = max_wait.as_secs(),
            "Starting ingestion run"
        );

        if cancel.is_cancelled() {
            return IngestionOutcome::Cancelled;
        }

        if let Err(e) = self.provisioner.ensure_schema(schema, mapping).await {
            warn!(table = %table, error = %e, "Provisioning failed");
            return IngestionOutcome::Failed(FailureReason::from(&e));
        }

        if cancel.is_cancelled() {
            info!(table = %table, "Cancelled after provisioning");
            return IngestionOutcome::Cancelled;
        }

        let handle = match self.submitter.submit(source, table, mapping).await {
            Ok(handle) => handle,
            Err(e) => return IngestionOutcome::Failed(FailureReason::from(&e)),
        };

        let outcome = self.poller.await_cancellable(&handle, max_wait, cancel).await;
        info!(table = %table, operation_id = %handle.operation_id, outcome = %outcome, "Ingestion run finished");
        outcome
    }

    /// Run in a background task. The returned [`IngestionTask`] can cancel
    /// the run and wait for its single outcome.
    pub fn spawn(
        self: &Arc<Self>,
        schema: SchemaDefinition,
        mapping: IngestionMapping,
        source: SourceLocation,
        max_wait: Duration,
    ) -> IngestionTask {
        let (cancel, signal) = cancel_pair();
        let (tx, rx) = oneshot::channel();
        let orchestrator = Arc::clone(self);

        tokio::spawn(async move {
            let outcome = orchestrator
                .run_cancellable(&schema, &mapping, &source, max_wait, signal)
                .await;
            // The receiver may already be gone; nobody is waiting then.
            let _ = tx.send(outcome);
        });

        IngestionTask { cancel, outcome: rx }
    }
}

/// Handle to a run started with [`IngestionOrchestrator::spawn`].
///
/// Dropping the handle cancels the run.
pub struct IngestionTask {
    cancel: CancelHandle,
    outcome: oneshot::Receiver<IngestionOutcome>,
}

impl IngestionTask {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A handle that can cancel the run from elsewhere (e.g. a signal handler).
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub async fn wait(mut self) -> IngestionOutcome {
        (&mut self.outcome).await.unwrap_or_else(|_| {
            IngestionOutcome::failed(FailureKind::TaskAborted, "ingestion task ended without an outcome")
        })
    }
}

impl Drop for IngestionTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
