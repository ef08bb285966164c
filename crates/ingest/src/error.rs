//! Error types for each orchestration step.
//!
//! Every variant converts into a [`FailureReason`] so the orchestrator can
//! surface it as a typed [`IngestionOutcome::Failed`](crate::IngestionOutcome).

use adx_core::SchemaError;

use crate::client::ClientError;
use crate::outcome::{FailureKind, FailureReason};

/// Provisioning the table or its mapping failed.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Mapping {mapping} does not fit table {table}: {source}")]
    InvalidMapping {
        table: String,
        mapping: String,
        #[source]
        source: SchemaError,
    },

    #[error("Failed to create table {table}: {source}")]
    CreateFailed {
        table: String,
        #[source]
        source: ClientError,
    },

    #[error("Failed to create mapping {mapping} on {table}: {source}")]
    MappingFailed {
        table: String,
        mapping: String,
        #[source]
        source: ClientError,
    },
}

/// The ingestion request could not be submitted.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Failed to submit ingestion into {table}: {source}")]
    TransportFailure {
        table: String,
        #[source]
        source: ClientError,
    },

    #[error("Ingestion into {table} was rejected: {source}")]
    Rejected {
        table: String,
        #[source]
        source: ClientError,
    },
}

/// Status polling gave up.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Status of {operation_id} unavailable after {attempts} attempt(s): {source}")]
    PollingUnavailable {
        operation_id: String,
        attempts: u32,
        #[source]
        source: ClientError,
    },
}

impl From<&ProvisionError> for FailureReason {
    fn from(err: &ProvisionError) -> Self {
        let kind = match err {
            ProvisionError::InvalidMapping { .. } => FailureKind::InvalidMapping,
            ProvisionError::CreateFailed { .. } => FailureKind::CreateFailed,
            ProvisionError::MappingFailed { .. } => FailureKind::MappingFailed,
        };
        FailureReason::new(kind, err.to_string())
    }
}

impl From<&SubmitError> for FailureReason {
    fn from(err: &SubmitError) -> Self {
        let kind = match err {
            SubmitError::TransportFailure { .. } => FailureKind::TransportFailure,
            SubmitError::Rejected { .. } => FailureKind::SubmissionRejected,
        };
        FailureReason::new(kind, err.to_string())
    }
}

impl From<&PollError> for FailureReason {
    fn from(err: &PollError) -> Self {
        match err {
            PollError::PollingUnavailable { .. } => {
                FailureReason::new(FailureKind::PollingUnavailable, err.to_string())
            }
        }
    }
}
