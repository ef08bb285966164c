//! End-to-end runs of IngestionOrchestrator with mocked collaborators.

use std::sync::Arc;
use std::time::Duration;

use adx_core::{ColumnType, DataFormat, IngestionMapping, MappingColumn};
use adx_ingest::*;

use crate::mocks::{fast_policy, storm_mapping, storm_schema, storm_source, AfterScript, MockControlPlane, MockDataPlane};

fn orchestrator(control: Arc<MockControlPlane>, data: Arc<MockDataPlane>) -> IngestionOrchestrator {
    let config = OrchestratorConfig {
        poll_policy: fast_policy(),
        ..OrchestratorConfig::new("Samples")
    };
    IngestionOrchestrator::new(control, data, config)
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_succeeds_on_second_poll() {
    let control = MockControlPlane::new();
    let data = MockDataPlane::succeeds_after(1);
    let orch = orchestrator(control.clone(), data.clone());

    let outcome = orch
        .run(&storm_schema(), &storm_mapping(), &storm_source(), Duration::from_secs(60))
        .await;

    assert_eq!(outcome, IngestionOutcome::Succeeded);
    assert_eq!(control.commands().len(), 3);
    assert_eq!(data.submit_calls(), 1);
    assert_eq!(data.status_calls(), 2);

    let submitted = data.submitted.lock().unwrap();
    assert_eq!(submitted[0].table, "StormEvents");
    assert_eq!(submitted[0].database, "Samples");
    assert_eq!(submitted[0].mapping_reference, "StormEvents_CSV_Mapping");
    assert_eq!(submitted[0].format, DataFormat::Csv);
}

#[tokio::test(start_paused = true)]
async fn test_submit_transport_failure_never_polls() {
    let control = MockControlPlane::new();
    let data = MockDataPlane::failing_submit(ClientError::Transport("connection refused".into()));
    let orch = orchestrator(control.clone(), data.clone());

    let outcome = orch
        .run(&storm_schema(), &storm_mapping(), &storm_source(), Duration::from_secs(60))
        .await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::TransportFailure));
    assert_eq!(data.submit_calls(), 1);
    assert_eq!(data.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_submit_auth_failure_is_transport_failure() {
    let control = MockControlPlane::new();
    let data = MockDataPlane::failing_submit(ClientError::Auth("no ingestor role".into()));
    let orch = orchestrator(control, data.clone());

    let outcome = orch
        .run(&storm_schema(), &storm_mapping(), &storm_source(), Duration::from_secs(60))
        .await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::TransportFailure));
    assert_eq!(data.submit_calls(), 1);
    assert_eq!(data.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_submit_rejection_is_distinct() {
    let control = MockControlPlane::new();
    let data = MockDataPlane::failing_submit(ClientError::Service {
        status: 400,
        message: "Bad request: mapping 'StormEvents_CSV_Mapping' not found".into(),
    });
    let orch = orchestrator(control, data.clone());

    let outcome = orch
        .run(&storm_schema(), &storm_mapping(), &storm_source(), Duration::from_secs(60))
        .await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::SubmissionRejected));
    assert_eq!(data.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_provision_failure_short_circuits() {
    let control = MockControlPlane::new();
    control.fail(".create table", ClientError::Service { status: 400, message: "bad column type".into() });
    let data = MockDataPlane::succeeds_after(0);
    let orch = orchestrator(control.clone(), data.clone());

    let outcome = orch
        .run(&storm_schema(), &storm_mapping(), &storm_source(), Duration::from_secs(60))
        .await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::CreateFailed));
    match &outcome {
        IngestionOutcome::Failed(reason) => assert!(reason.detail.contains("bad column type")),
        other => panic!("expected Failed, got {other}"),
    }
    assert_eq!(data.submit_calls(), 0);
    assert_eq!(data.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_mapping_sends_nothing() {
    let control = MockControlPlane::new();
    let data = MockDataPlane::succeeds_after(0);
    let orch = orchestrator(control.clone(), data.clone());

    let mapping = IngestionMapping::new(
        "StormEvents_CSV_Mapping",
        DataFormat::Csv,
        vec![MappingColumn {
            source: "StartTime".into(),
            target: "StartTime".into(),
            ordinal: 0,
            column_type: ColumnType::String,
        }],
    )
    .unwrap();

    let outcome = orch
        .run(&storm_schema(), &mapping, &storm_source(), Duration::from_secs(60))
        .await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::InvalidMapping));
    assert!(control.commands().is_empty());
    assert_eq!(data.submit_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_reported() {
    let control = MockControlPlane::new();
    let data = MockDataPlane::always_pending();
    let orch = orchestrator(control, data);

    let outcome = orch
        .run(&storm_schema(), &storm_mapping(), &storm_source(), Duration::from_secs(10))
        .await;

    assert!(matches!(outcome, IngestionOutcome::TimedOut { .. }));
    assert_eq!(outcome.failure_kind(), None);
}

#[tokio::test(start_paused = true)]
async fn test_precancelled_run_does_nothing() {
    let control = MockControlPlane::new();
    let data = MockDataPlane::succeeds_after(0);
    let orch = orchestrator(control.clone(), data.clone());
    let (cancel, signal) = cancel_pair();
    cancel.cancel();

    let outcome = orch
        .run_cancellable(&storm_schema(), &storm_mapping(), &storm_source(), Duration::from_secs(60), signal)
        .await;

    assert_eq!(outcome, IngestionOutcome::Cancelled);
    assert!(control.commands().is_empty());
    assert_eq!(data.submit_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_provisioning_skips_submission() {
    let control = MockControlPlane::new();
    let data = MockDataPlane::succeeds_after(0);
    let orch = orchestrator(control.clone(), data.clone());
    let (cancel, signal) = cancel_pair();
    control.cancel_on(".create-or-alter", cancel);

    let outcome = orch
        .run_cancellable(&storm_schema(), &storm_mapping(), &storm_source(), Duration::from_secs(60), signal)
        .await;

    assert_eq!(outcome, IngestionOutcome::Cancelled);
    // Provisioning ran to completion; nothing after it did.
    assert_eq!(control.count_prefix(".create-or-alter"), 1);
    assert_eq!(data.submit_calls(), 0);
    assert_eq!(data.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_spawned_run_delivers_outcome() {
    let control = MockControlPlane::new();
    let data = MockDataPlane::succeeds_after(3);
    let orch = Arc::new(orchestrator(control, data.clone()));

    let task = orch.spawn(storm_schema(), storm_mapping(), storm_source(), Duration::from_secs(60));
    assert_eq!(task.wait().await, IngestionOutcome::Succeeded);
    assert_eq!(data.status_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_spawned_run_can_be_cancelled() {
    let control = MockControlPlane::new();
    let data = MockDataPlane::always_pending();
    let orch = Arc::new(orchestrator(control, data.clone()));

    let task = orch.spawn(storm_schema(), storm_mapping(), storm_source(), Duration::from_secs(600));
    tokio::time::sleep(Duration::from_secs(5)).await;
    let polled = data.status_calls();
    assert!(polled >= 1);

    task.cancel();
    assert_eq!(task.wait().await, IngestionOutcome::Cancelled);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(data.status_calls(), polled);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_task_stops_polling() {
    let control = MockControlPlane::new();
    let data = MockDataPlane::always_pending();
    let orch = Arc::new(orchestrator(control, data.clone()));

    let task = orch.spawn(storm_schema(), storm_mapping(), storm_source(), Duration::from_secs(600));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(data.status_calls() >= 1);

    drop(task);
    // Let the background run observe the cancellation.
    tokio::time::sleep(Duration::from_millis(1)).await;
    let polled = data.status_calls();

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(data.status_calls(), polled);
}

#[tokio::test(start_paused = true)]
async fn test_aborted_task_reports_task_aborted() {
    let control = MockControlPlane::new();
    let data = MockDataPlane::scripted(vec![], AfterScript::Panic);
    let orch = Arc::new(orchestrator(control, data));

    let task = orch.spawn(storm_schema(), storm_mapping(), storm_source(), Duration::from_secs(60));
    assert_eq!(task.wait().await.failure_kind(), Some(FailureKind::TaskAborted));
}

#[tokio::test(start_paused = true)]
async fn test_orchestrators_share_clients() {
    let control = MockControlPlane::new();
    let data = MockDataPlane::succeeds_after(0);
    let first = Arc::new(orchestrator(control.clone(), data.clone()));
    let second = Arc::new(orchestrator(control.clone(), data.clone()));

    let a = first.spawn(storm_schema(), storm_mapping(), storm_source(), Duration::from_secs(60));
    let b = second.spawn(storm_schema(), storm_mapping(), storm_source(), Duration::from_secs(60));

    assert!(a.wait().await.is_success());
    assert!(b.wait().await.is_success());
    assert_eq!(data.submit_calls(), 2);
    assert_eq!(control.commands().len(), 6);
}
