//! Blob ingestion submission and classification of refused requests.

use std::sync::Arc;

use tracing::{info, warn};

use adx_core::{IngestionMapping, SourceLocation};

use crate::client::{
    ClientError, DataPlaneClient, IngestionJobHandle, IngestionParameters, ReportLevel, ReportMethod,
};
use crate::error::SubmitError;

/// Submits one blob ingestion request per call.
pub struct IngestionSubmitter {
    client: Arc<dyn DataPlaneClient>,
    database: String,
    tags: Vec<String>,
}

impl IngestionSubmitter {
    pub fn new(client: Arc<dyn DataPlaneClient>, database: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
            tags: Vec::new(),
        }
    }

    /// Tags attached to every extent this submitter creates.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn parameters(&self, table: &str, mapping: &IngestionMapping) -> IngestionParameters {
        IngestionParameters {
            database: self.database.clone(),
            table: table.to_string(),
            format: mapping.format(),
            mapping_reference: mapping.name().to_string(),
            mapping_kind: mapping.kind(),
            report_level: ReportLevel::FailuresAndSuccesses,
            report_method: ReportMethod::QueueAndTable,
            tags: self.tags.clone(),
        }
    }

    pub async fn submit(
        &self,
        source: &SourceLocation,
        table: &str,
        mapping: &IngestionMapping,
    ) -> Result<IngestionJobHandle, SubmitError> {
        let params = self.parameters(table, mapping);

        match self.client.submit_blob_ingestion(source, &params).await {
            Ok(handle) => {
                info!(
                    table = %table,
                    source = %source,
                    operation_id = %handle.operation_id,
                    "Ingestion submitted"
                );
                Ok(handle)
            }
            Err(source_err) if is_rejection(&source_err) => {
                warn!(table = %table, error = %source_err, "Ingestion rejected");
                Err(SubmitError::Rejected {
                    table: table.to_string(),
                    source: source_err,
                })
            }
            Err(source_err) => {
                warn!(table = %table, error = %source_err, "Ingestion submission failed");
                Err(SubmitError::TransportFailure {
                    table: table.to_string(),
                    source: source_err,
                })
            }
        }
    }
}

/// The service answered and refused the request itself. Network and
/// identity failures say nothing about the request and stay transport
/// failures.
fn is_rejection(err: &ClientError) -> bool {
    matches!(err, ClientError::Service { status, .. } if (400..500).contains(status) && !err.is_transient())
}
