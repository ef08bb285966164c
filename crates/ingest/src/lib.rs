//! Ingestion orchestration for a Kusto-style data warehouse.
//!
//! This crate provides:
//! - Collaborator traits for the control plane, data plane and credentials
//! - `SchemaProvisioner`, `IngestionSubmitter` and `StatusPoller`
//! - `IngestionOrchestrator`, which runs provision → submit → wait as one operation
//! - Kusto bindings (AAD tokens, REST management commands, direct ingestion)

pub mod cancel;
pub mod client;
pub mod commands;
pub mod error;
pub mod kusto;
pub mod orchestrator;
pub mod outcome;
pub mod poll;
pub mod provision;
pub mod submit;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use client::{
    ClientError, ControlPlaneClient, CredentialProvider, DataPlaneClient, IngestionJobHandle, IngestionParameters,
    JobStatus, ReportLevel, ReportMethod, ResultColumn, ResultSet,
};
pub use error::{PollError, ProvisionError, SubmitError};
pub use orchestrator::{IngestionOrchestrator, IngestionTask, OrchestratorConfig};
pub use outcome::{FailureKind, FailureReason, IngestionOutcome};
pub use poll::{PollPolicy, StatusPoller};
pub use provision::{ProvisionMode, SchemaProvisioner};
pub use submit::IngestionSubmitter;
