//! SchemaProvisioner against a recording control plane.

use adx_core::samples;
use adx_ingest::*;

use crate::mocks::{storm_mapping, storm_schema, MockControlPlane};

#[tokio::test]
async fn test_ensure_schema_is_idempotent() {
    let control = MockControlPlane::new();
    let provisioner = SchemaProvisioner::new(control.clone(), "Samples", ProvisionMode::Reset);

    provisioner.ensure_schema(&storm_schema(), &storm_mapping()).await.unwrap();
    provisioner.ensure_schema(&storm_schema(), &storm_mapping()).await.unwrap();

    let commands = control.commands();
    assert_eq!(commands.len(), 6);
    assert_eq!(commands[..3], commands[3..]);
}

#[tokio::test]
async fn test_second_run_tolerates_missing_table_on_drop() {
    let control = MockControlPlane::new();
    control.fail(".drop", ClientError::NotFound("StormEvents".into()));
    let provisioner = SchemaProvisioner::new(control.clone(), "Samples", ProvisionMode::Reset);

    provisioner.ensure_schema(&storm_schema(), &storm_mapping()).await.unwrap();
    provisioner.ensure_schema(&storm_schema(), &storm_mapping()).await.unwrap();
    assert_eq!(control.count_prefix(".create table"), 2);
}

#[tokio::test]
async fn test_merge_mode_is_idempotent_without_drop() {
    let control = MockControlPlane::new();
    let provisioner = SchemaProvisioner::new(control.clone(), "Samples", ProvisionMode::Merge);

    provisioner.ensure_schema(&storm_schema(), &storm_mapping()).await.unwrap();
    provisioner.ensure_schema(&storm_schema(), &storm_mapping()).await.unwrap();

    assert_eq!(control.count_prefix(".drop"), 0);
    assert_eq!(control.count_prefix(".create-merge table ['StormEvents']"), 2);
    assert_eq!(control.count_prefix(".create-or-alter table ['StormEvents'] ingestion csv mapping"), 2);
}

#[tokio::test]
async fn test_create_command_lists_columns_in_order() {
    let control = MockControlPlane::new();
    let provisioner = SchemaProvisioner::new(control.clone(), "Samples", ProvisionMode::Reset);
    provisioner.ensure_schema(&storm_schema(), &storm_mapping()).await.unwrap();

    let create = &control.commands()[1];
    assert_eq!(
        create,
        ".create table ['StormEvents'] (StartTime: datetime, State: string, DamageProperty: int)"
    );
}

#[tokio::test]
async fn test_sample_dataset_provisions() {
    let control = MockControlPlane::new();
    let provisioner = SchemaProvisioner::new(control.clone(), "Samples", ProvisionMode::Reset);

    let schema = samples::storm_events_schema().unwrap();
    let mapping = samples::storm_events_mapping().unwrap();
    provisioner.ensure_schema(&schema, &mapping).await.unwrap();

    let mapping_cmd = &control.commands()[2];
    assert!(mapping_cmd.contains("'StormEvents_CSV_Mapping'"));
    assert!(mapping_cmd.contains(r#""Ordinal":16"#));
    assert!(!mapping_cmd.contains(r#""Ordinal":15,"#));
}

#[tokio::test]
async fn test_failures_are_classified() {
    let control = MockControlPlane::new();
    control.fail(".create table", ClientError::Auth("principal lacks admin role".into()));
    let provisioner = SchemaProvisioner::new(control.clone(), "Samples", ProvisionMode::Reset);

    let err = provisioner.ensure_schema(&storm_schema(), &storm_mapping()).await.unwrap_err();
    assert_eq!(FailureReason::from(&err).kind, FailureKind::CreateFailed);
    assert_eq!(control.count_prefix(".create-or-alter"), 0);

    let control = MockControlPlane::new();
    control.fail(".create-or-alter", ClientError::Service { status: 400, message: "bad json".into() });
    let provisioner = SchemaProvisioner::new(control.clone(), "Samples", ProvisionMode::Reset);

    let err = provisioner.ensure_schema(&storm_schema(), &storm_mapping()).await.unwrap_err();
    assert_eq!(FailureReason::from(&err).kind, FailureKind::MappingFailed);
}
