//! Direct blob ingestion tracked through `.show operations`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use adx_core::SourceLocation;

use crate::client::{ClientError, ControlPlaneClient, DataPlaneClient, IngestionJobHandle, IngestionParameters, JobStatus};
use crate::commands;

/// Map an operation `State` (and its `Status` text) to a [`JobStatus`].
pub fn map_operation_state(state: &str, detail: &str) -> JobStatus {
    let detail = if detail.is_empty() { state.to_string() } else { detail.to_string() };
    match state {
        "InProgress" | "Scheduled" | "Throttled" => JobStatus::Pending,
        "Completed" => JobStatus::Succeeded,
        "PartiallySucceeded" => JobStatus::PartiallySucceeded(detail),
        "Failed" | "Abandoned" | "BadInput" => JobStatus::Failed(detail),
        "Skipped" => JobStatus::Skipped(detail),
        "Canceled" | "Cancelled" => JobStatus::Cancelled(detail),
        other => {
            warn!(state = %other, "Unknown operation state, treating as pending");
            JobStatus::Pending
        }
    }
}

/// Data-plane client that issues `.ingest async` on the engine endpoint.
pub struct KustoIngestClient {
    control: Arc<dyn ControlPlaneClient>,
    database: String,
}

impl KustoIngestClient {
    pub fn new(control: Arc<dyn ControlPlaneClient>, database: impl Into<String>) -> Self {
        Self {
            control,
            database: database.into(),
        }
    }
}

#[async_trait]
impl DataPlaneClient for KustoIngestClient {
    async fn submit_blob_ingestion(
        &self,
        source: &SourceLocation,
        params: &IngestionParameters,
    ) -> Result<IngestionJobHandle, ClientError> {
        debug!(
            table = %params.table,
            source = %source,
            report_level = params.report_level.as_str(),
            report_method = params.report_method.as_str(),
            "Submitting blob ingestion"
        );
        let result = self
            .control
            .execute(&params.database, &commands::ingest_async(source, params))
            .await?;
        let operation_id = result
            .get_str(0, "OperationId")
            .ok_or_else(|| ClientError::Parse("ingest response has no OperationId".into()))?;
        Ok(IngestionJobHandle::new(operation_id, &params.table))
    }

    async fn query_status(&self, handle: &IngestionJobHandle) -> Result<JobStatus, ClientError> {
        if !commands::is_valid_operation_id(&handle.operation_id) {
            return Err(ClientError::Parse(format!("invalid operation id {}", handle.operation_id)));
        }
        let result = self
            .control
            .execute(&self.database, &commands::show_operation(&handle.operation_id))
            .await?;

        // The operation may not be visible yet right after submission.
        let Some(state) = result.get_str(0, "State") else {
            return Ok(JobStatus::Queued);
        };
        let detail = result.get_str(0, "Status").unwrap_or_default();
        Ok(map_operation_state(&state, &detail))
    }
}
