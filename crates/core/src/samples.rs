//! The public StormEvents sample dataset: table schema, CSV mapping and blob.

use crate::error::SchemaError;
use crate::schema::{ColumnType, DataFormat, IngestionMapping, MappingColumn, SchemaDefinition};
use crate::source::SourceLocation;

pub const STORM_EVENTS_TABLE: &str = "StormEvents";
pub const STORM_EVENTS_MAPPING: &str = "StormEvents_CSV_Mapping";
pub const SAMPLE_ACCOUNT: &str = "kustosamplefiles";
pub const SAMPLE_CONTAINER: &str = "samplefiles";
pub const SAMPLE_FILE: &str = "StormEvents.csv";

/// Columns with their position in the CSV file. Field 15 of the file is not mapped.
const STORM_EVENTS_COLUMNS: &[(&str, ColumnType, u32)] = &[
    ("StartTime", ColumnType::Datetime, 0),
    ("EndTime", ColumnType::Datetime, 1),
    ("EpisodeId", ColumnType::Int, 2),
    ("EventId", ColumnType::Int, 3),
    ("State", ColumnType::String, 4),
    ("EventType", ColumnType::String, 5),
    ("InjuriesDirect", ColumnType::Int, 6),
    ("InjuriesIndirect", ColumnType::Int, 7),
    ("DeathsDirect", ColumnType::Int, 8),
    ("DeathsIndirect", ColumnType::Int, 9),
    ("DamageProperty", ColumnType::Int, 10),
    ("DamageCrops", ColumnType::Int, 11),
    ("Source", ColumnType::String, 12),
    ("BeginLocation", ColumnType::String, 13),
    ("EndLocation", ColumnType::String, 14),
    ("BeginLat", ColumnType::Real, 16),
    ("BeginLon", ColumnType::Real, 17),
    ("EndLat", ColumnType::Real, 18),
    ("EndLon", ColumnType::Real, 19),
    ("EpisodeNarrative", ColumnType::String, 20),
    ("EventNarrative", ColumnType::String, 21),
    ("StormSummary", ColumnType::Dynamic, 22),
];

pub fn storm_events_schema() -> Result<SchemaDefinition, SchemaError> {
    SchemaDefinition::new(
        STORM_EVENTS_TABLE,
        STORM_EVENTS_COLUMNS.iter().map(|(name, ty, _)| (*name, *ty)),
    )
}

pub fn storm_events_mapping() -> Result<IngestionMapping, SchemaError> {
    let columns = STORM_EVENTS_COLUMNS
        .iter()
        .map(|(name, ty, ordinal)| MappingColumn {
            source: name.to_string(),
            target: name.to_string(),
            ordinal: *ordinal,
            column_type: *ty,
        })
        .collect();
    IngestionMapping::new(STORM_EVENTS_MAPPING, DataFormat::Csv, columns)
}

/// The sample CSV in the public samples account; `token` is a SAS query string.
pub fn storm_events_source(token: Option<&str>) -> Result<SourceLocation, SchemaError> {
    SourceLocation::azure_blob(SAMPLE_ACCOUNT, SAMPLE_CONTAINER, SAMPLE_FILE, token)
}
