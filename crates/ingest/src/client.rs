//! Collaborator interfaces consumed by the orchestration core.
//!
//! The control plane executes management commands; the data plane accepts
//! blob ingestion requests and reports their status; the credential provider
//! supplies identity and resolves endpoints. All three are shared across runs
//! behind `Arc<dyn ...>`, so implementations must be `Send + Sync`.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use adx_core::{DataFormat, MappingKind, SourceLocation};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure reported by a collaborator client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// Credentials were rejected or a token could not be obtained.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The addressed entity (table, mapping, operation) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The service answered with an error status.
    #[error("service error {status}: {message}")]
    Service { status: u16, message: String },

    /// The response could not be decoded.
    #[error("unexpected response: {0}")]
    Parse(String),
}

impl ClientError {
    /// Whether retrying the same request later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Service { status, .. } => *status == 429 || *status >= 500,
            ClientError::Auth(_) | ClientError::NotFound(_) | ClientError::Parse(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Control plane
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultColumn {
    pub name: String,
    pub data_type: String,
}

/// First table of a command response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<ResultColumn>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl ResultSet {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// String value at `row`/`col`; non-string scalars are rendered as text.
    pub fn get_str(&self, row: usize, col: &str) -> Option<String> {
        let idx = self.column_index(col)?;
        match self.rows.get(row)?.get(idx)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Executes management commands (`.create table ...`) against a database.
#[async_trait]
pub trait ControlPlaneClient: Send + Sync {
    async fn execute(&self, database: &str, command: &str) -> Result<ResultSet, ClientError>;
}

// ---------------------------------------------------------------------------
// Data plane
// ---------------------------------------------------------------------------

/// Which ingestion results the service should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportLevel {
    FailuresOnly,
    None,
    FailuresAndSuccesses,
}

/// Where the service should report ingestion results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportMethod {
    Queue,
    Table,
    QueueAndTable,
}

impl ReportLevel {
    /// Value of the `reportLevel` ingestion property.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportLevel::FailuresOnly => "FailuresOnly",
            ReportLevel::None => "DoNotReport",
            ReportLevel::FailuresAndSuccesses => "FailuresAndSuccesses",
        }
    }
}

impl ReportMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportMethod::Queue => "Queue",
            ReportMethod::Table => "Table",
            ReportMethod::QueueAndTable => "QueueAndTable",
        }
    }
}

/// Everything the data plane needs to ingest one blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionParameters {
    pub database: String,
    pub table: String,
    pub format: DataFormat,
    pub mapping_reference: String,
    pub mapping_kind: MappingKind,
    pub report_level: ReportLevel,
    pub report_method: ReportMethod,
    /// Free-form tags attached to the ingested extents.
    pub tags: Vec<String>,
}

/// Identifies a submitted ingestion job for status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionJobHandle {
    /// Service-assigned operation id.
    pub operation_id: String,
    /// Locally generated id of the submitted source.
    pub source_id: Uuid,
    pub table: String,
    pub submitted_at: DateTime<Utc>,
}

impl IngestionJobHandle {
    pub fn new(operation_id: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            source_id: Uuid::new_v4(),
            table: table.into(),
            submitted_at: Utc::now(),
        }
    }
}

impl fmt::Display for IngestionJobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} -> {})", self.operation_id, self.source_id, self.table)
    }
}

/// Status of an ingestion job as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Accepted but not yet picked up.
    Queued,
    /// Being processed.
    Pending,
    Succeeded,
    /// Some of the data was ingested; the detail says what failed.
    PartiallySucceeded(String),
    Failed(String),
    /// The service decided not to ingest the source (e.g. duplicate).
    Skipped(String),
    /// Cancelled on the service side.
    Cancelled(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Queued | JobStatus::Pending)
    }
}

/// Submits blob ingestion jobs and reports their status.
#[async_trait]
pub trait DataPlaneClient: Send + Sync {
    async fn submit_blob_ingestion(
        &self,
        source: &SourceLocation,
        params: &IngestionParameters,
    ) -> Result<IngestionJobHandle, ClientError>;

    async fn query_status(&self, handle: &IngestionJobHandle) -> Result<JobStatus, ClientError>;
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Supplies application identity and bearer tokens.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Application (client) id the tokens are issued to.
    fn application_id(&self) -> &str;

    /// Bearer token valid for `resource` (an endpoint URL).
    async fn access_token(&self, resource: &str) -> Result<String, ClientError>;

    /// Ingestion endpoint for a cluster endpoint: `https://ingest-{host}`.
    fn ingestion_endpoint(&self, base: &str) -> Result<String, ClientError> {
        ingestion_endpoint(base)
    }
}

/// Resolve a cluster endpoint to its ingestion endpoint.
pub fn ingestion_endpoint(base: &str) -> Result<String, ClientError> {
    let url = url::Url::parse(base).map_err(|e| ClientError::Parse(format!("invalid endpoint {base}: {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| ClientError::Parse(format!("endpoint {base} has no host")))?;
    if host.starts_with("ingest-") {
        return Ok(format!("https://{host}"));
    }
    Ok(format!("https://ingest-{host}"))
}
