//! Hand-written collaborators with call counters.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use adx_core::{ColumnType, DataFormat, IngestionMapping, SchemaDefinition, SourceLocation};
use adx_ingest::*;

// ── Control plane ───────────────────────────────────────────────────

/// Records every command; answers from prefix-matched canned responses.
#[derive(Default)]
pub struct MockControlPlane {
    commands: Mutex<Vec<String>>,
    responses: Mutex<Vec<(String, Result<ResultSet, ClientError>)>>,
    cancel_on: Mutex<Option<(String, CancelHandle)>>,
}

impl MockControlPlane {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, prefix: &str, response: Result<ResultSet, ClientError>) {
        self.responses.lock().unwrap().push((prefix.to_string(), response));
    }

    pub fn fail(&self, prefix: &str, error: ClientError) {
        self.respond(prefix, Err(error));
    }

    /// Fire `cancel` while executing the first command that starts with `prefix`.
    pub fn cancel_on(&self, prefix: &str, cancel: CancelHandle) {
        *self.cancel_on.lock().unwrap() = Some((prefix.to_string(), cancel));
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.commands().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

#[async_trait]
impl ControlPlaneClient for MockControlPlane {
    async fn execute(&self, _database: &str, command: &str) -> Result<ResultSet, ClientError> {
        self.commands.lock().unwrap().push(command.to_string());
        if let Some((prefix, cancel)) = self.cancel_on.lock().unwrap().as_ref() {
            if command.starts_with(prefix.as_str()) {
                cancel.cancel();
            }
        }
        let responses = self.responses.lock().unwrap();
        responses
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| Ok(ResultSet::default()))
    }
}

// ── Data plane ──────────────────────────────────────────────────────

/// How `query_status` behaves once the scripted statuses run out.
#[derive(Clone)]
pub enum AfterScript {
    Repeat(Result<JobStatus, ClientError>),
    Hang,
    Panic,
}

pub struct MockDataPlane {
    submit_result: Mutex<Result<(), ClientError>>,
    script: Mutex<VecDeque<Result<JobStatus, ClientError>>>,
    after: AfterScript,
    pub submit_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub submitted: Mutex<Vec<IngestionParameters>>,
}

impl MockDataPlane {
    pub fn scripted(script: Vec<Result<JobStatus, ClientError>>, after: AfterScript) -> Arc<Self> {
        Arc::new(Self {
            submit_result: Mutex::new(Ok(())),
            script: Mutex::new(script.into()),
            after,
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub fn always_pending() -> Arc<Self> {
        Self::scripted(vec![], AfterScript::Repeat(Ok(JobStatus::Pending)))
    }

    /// Pending for `pending_polls` queries, then succeeded.
    pub fn succeeds_after(pending_polls: usize) -> Arc<Self> {
        let mut script = vec![Ok(JobStatus::Pending); pending_polls];
        script.push(Ok(JobStatus::Succeeded));
        Self::scripted(script, AfterScript::Repeat(Ok(JobStatus::Succeeded)))
    }

    pub fn failing_submit(error: ClientError) -> Arc<Self> {
        let mock = Self::always_pending();
        *mock.submit_result.lock().unwrap() = Err(error);
        mock
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataPlaneClient for MockDataPlane {
    async fn submit_blob_ingestion(
        &self,
        _source: &SourceLocation,
        params: &IngestionParameters,
    ) -> Result<IngestionJobHandle, ClientError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(params.clone());
        self.submit_result
            .lock()
            .unwrap()
            .clone()
            .map(|_| IngestionJobHandle::new("5b9a2a64-6c2e-4f38-93a5-5f2ac3b9e1d0", &params.table))
    }

    async fn query_status(&self, _handle: &IngestionJobHandle) -> Result<JobStatus, ClientError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        if let Some(status) = next {
            return status;
        }
        match &self.after {
            AfterScript::Repeat(status) => status.clone(),
            AfterScript::Hang => std::future::pending().await,
            AfterScript::Panic => panic!("status endpoint exploded"),
        }
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub fn storm_schema() -> SchemaDefinition {
    SchemaDefinition::new(
        "StormEvents",
        [
            ("StartTime", ColumnType::Datetime),
            ("State", ColumnType::String),
            ("DamageProperty", ColumnType::Int),
        ],
    )
    .unwrap()
}

pub fn storm_mapping() -> IngestionMapping {
    IngestionMapping::by_ordinal("StormEvents_CSV_Mapping", DataFormat::Csv, &storm_schema()).unwrap()
}

pub fn storm_source() -> SourceLocation {
    SourceLocation::new("https://store/container/file.csv").unwrap()
}

pub fn handle() -> IngestionJobHandle {
    IngestionJobHandle::new("5b9a2a64-6c2e-4f38-93a5-5f2ac3b9e1d0", "StormEvents")
}

pub fn fast_policy() -> PollPolicy {
    PollPolicy::default().without_jitter()
}
