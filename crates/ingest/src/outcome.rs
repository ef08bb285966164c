//! The single result every ingestion run reports, and its failure taxonomy.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Machine-checkable category of a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Mapping does not fit the schema; nothing was sent.
    InvalidMapping,
    CreateFailed,
    MappingFailed,
    /// The ingestion request could not be delivered.
    TransportFailure,
    /// The service refused the ingestion request.
    SubmissionRejected,
    /// Status could not be queried within the retry budget.
    PollingUnavailable,
    IngestionFailed,
    PartiallySucceeded,
    IngestionSkipped,
    /// The background task ended without reporting.
    TaskAborted,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidMapping => "invalid_mapping",
            FailureKind::CreateFailed => "create_failed",
            FailureKind::MappingFailed => "mapping_failed",
            FailureKind::TransportFailure => "transport_failure",
            FailureKind::SubmissionRejected => "submission_rejected",
            FailureKind::PollingUnavailable => "polling_unavailable",
            FailureKind::IngestionFailed => "ingestion_failed",
            FailureKind::PartiallySucceeded => "partially_succeeded",
            FailureKind::IngestionSkipped => "ingestion_skipped",
            FailureKind::TaskAborted => "task_aborted",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub detail: String,
}

impl FailureReason {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

/// Terminal result of one orchestration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestionOutcome {
    Succeeded,
    Failed(FailureReason),
    /// The job was still pending when the wait budget ran out.
    TimedOut { waited: Duration },
    /// The caller aborted the run.
    Cancelled,
}

impl IngestionOutcome {
    pub fn failed(kind: FailureKind, detail: impl Into<String>) -> Self {
        IngestionOutcome::Failed(FailureReason::new(kind, detail))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, IngestionOutcome::Succeeded)
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            IngestionOutcome::Failed(reason) => Some(reason.kind),
            _ => None,
        }
    }
}

impl fmt::Display for IngestionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestionOutcome::Succeeded => write!(f, "succeeded"),
            IngestionOutcome::Failed(reason) => write!(f, "failed ({reason})"),
            IngestionOutcome::TimedOut { waited } => write!(f, "timed out after {}s", waited.as_secs()),
            IngestionOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}
