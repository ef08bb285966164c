//! Target table schema and ingestion mapping definitions.
//!
//! Both types are validated on construction and immutable afterwards; they
//! only know how to render themselves into the fragments a management command
//! needs (column list, mapping JSON). Command assembly lives with the clients.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

// ── Column types ──────────────────────────────────────────────

/// Scalar column types understood by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Bool,
    Datetime,
    Dynamic,
    Guid,
    Int,
    Long,
    Real,
    String,
    Timespan,
    Decimal,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Bool => "bool",
            ColumnType::Datetime => "datetime",
            ColumnType::Dynamic => "dynamic",
            ColumnType::Guid => "guid",
            ColumnType::Int => "int",
            ColumnType::Long => "long",
            ColumnType::Real => "real",
            ColumnType::String => "string",
            ColumnType::Timespan => "timespan",
            ColumnType::Decimal => "decimal",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(ColumnType::Bool),
            "datetime" | "date" => Ok(ColumnType::Datetime),
            "dynamic" => Ok(ColumnType::Dynamic),
            "guid" | "uniqueid" => Ok(ColumnType::Guid),
            "int" => Ok(ColumnType::Int),
            "long" => Ok(ColumnType::Long),
            "real" | "double" => Ok(ColumnType::Real),
            "string" => Ok(ColumnType::String),
            "timespan" | "time" => Ok(ColumnType::Timespan),
            "decimal" => Ok(ColumnType::Decimal),
            other => Err(SchemaError::UnknownColumnType(other.to_string())),
        }
    }
}

// ── Data formats ──────────────────────────────────────────────

/// Source file format of the blob being ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Csv,
    Tsv,
    Psv,
    Json,
    MultiJson,
    Parquet,
}

/// Mapping kind registered on the table; several formats share one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
    Csv,
    Json,
    Parquet,
}

impl DataFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataFormat::Csv => "csv",
            DataFormat::Tsv => "tsv",
            DataFormat::Psv => "psv",
            DataFormat::Json => "json",
            DataFormat::MultiJson => "multijson",
            DataFormat::Parquet => "parquet",
        }
    }

    pub fn mapping_kind(&self) -> MappingKind {
        match self {
            DataFormat::Csv | DataFormat::Tsv | DataFormat::Psv => MappingKind::Csv,
            DataFormat::Json | DataFormat::MultiJson => MappingKind::Json,
            DataFormat::Parquet => MappingKind::Parquet,
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataFormat {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(DataFormat::Csv),
            "tsv" => Ok(DataFormat::Tsv),
            "psv" => Ok(DataFormat::Psv),
            "json" => Ok(DataFormat::Json),
            "multijson" => Ok(DataFormat::MultiJson),
            "parquet" => Ok(DataFormat::Parquet),
            other => Err(SchemaError::UnknownDataFormat(other.to_string())),
        }
    }
}

impl MappingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingKind::Csv => "csv",
            MappingKind::Json => "json",
            MappingKind::Parquet => "parquet",
        }
    }
}

impl fmt::Display for MappingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Identifiers ───────────────────────────────────────────────

/// Plain identifiers only: `[A-Za-z_][A-Za-z0-9_]*`.
fn check_identifier(name: &str) -> Result<(), SchemaError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}

/// Mapping names additionally allow `-` and `.`.
fn check_mapping_name(name: &str) -> Result<(), SchemaError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}

// ── SchemaDefinition ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

/// Table name plus ordered, typed columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDefinition {
    table: String,
    columns: Vec<Column>,
}

impl SchemaDefinition {
    pub fn new<I, S>(table: impl Into<String>, columns: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (S, ColumnType)>,
        S: Into<String>,
    {
        let table = table.into();
        if table.is_empty() {
            return Err(SchemaError::EmptyTableName);
        }
        check_identifier(&table)?;

        let columns: Vec<Column> = columns
            .into_iter()
            .map(|(name, column_type)| Column {
                name: name.into(),
                column_type,
            })
            .collect();
        if columns.is_empty() {
            return Err(SchemaError::NoColumns(table));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for col in &columns {
            check_identifier(&col.name)?;
            if !seen.insert(col.name.as_str()) {
                return Err(SchemaError::DuplicateColumn(col.name.clone()));
            }
        }

        Ok(Self { table, columns })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// `(StartTime: datetime, State: string)` without the parentheses.
    pub fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("{}: {}", c.name, c.column_type))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ── IngestionMapping ──────────────────────────────────────────

/// One source field routed into one table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingColumn {
    /// Header name (delimited formats) or property name (JSON/Parquet).
    pub source: String,
    pub target: String,
    pub ordinal: u32,
    pub column_type: ColumnType,
}

/// A named description of how a source file's fields land in table columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionMapping {
    name: String,
    format: DataFormat,
    columns: Vec<MappingColumn>,
}

impl IngestionMapping {
    pub fn new(
        name: impl Into<String>,
        format: DataFormat,
        columns: Vec<MappingColumn>,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        check_mapping_name(&name)?;
        if columns.is_empty() {
            return Err(SchemaError::EmptyMapping(name));
        }

        let mut ordinals = HashSet::with_capacity(columns.len());
        let mut targets = HashSet::with_capacity(columns.len());
        for col in &columns {
            if !ordinals.insert(col.ordinal) {
                return Err(SchemaError::DuplicateOrdinal(col.ordinal));
            }
            if !targets.insert(col.target.as_str()) {
                return Err(SchemaError::DuplicateTarget(col.target.clone()));
            }
        }

        Ok(Self {
            name,
            format,
            columns,
        })
    }

    /// Map every schema column by its position, using column names as source fields.
    pub fn by_ordinal(
        name: impl Into<String>,
        format: DataFormat,
        schema: &SchemaDefinition,
    ) -> Result<Self, SchemaError> {
        let columns = schema
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| MappingColumn {
                source: c.name.clone(),
                target: c.name.clone(),
                ordinal: i as u32,
                column_type: c.column_type,
            })
            .collect();
        Self::new(name, format, columns)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> DataFormat {
        self.format
    }

    pub fn kind(&self) -> MappingKind {
        self.format.mapping_kind()
    }

    pub fn columns(&self) -> &[MappingColumn] {
        &self.columns
    }

    /// Check that every mapped column exists in `schema` with the same type.
    pub fn validate_against(&self, schema: &SchemaDefinition) -> Result<(), SchemaError> {
        for col in &self.columns {
            let declared = schema.column(&col.target).ok_or_else(|| SchemaError::UnknownTarget {
                table: schema.table().to_string(),
                column: col.target.clone(),
            })?;
            if declared.column_type != col.column_type {
                return Err(SchemaError::TypeMismatch {
                    column: col.target.clone(),
                    mapped: col.column_type.to_string(),
                    declared: declared.column_type.to_string(),
                });
            }
        }
        Ok(())
    }

    /// JSON body of the mapping-registration command.
    ///
    /// Delimited formats address fields by ordinal; JSON and Parquet by path.
    pub fn to_json(&self) -> String {
        let entries: Vec<serde_json::Value> = self
            .columns
            .iter()
            .map(|c| match self.kind() {
                MappingKind::Csv => serde_json::json!({
                    "Name": c.target,
                    "datatype": c.column_type.as_str(),
                    "Ordinal": c.ordinal,
                }),
                MappingKind::Json | MappingKind::Parquet => serde_json::json!({
                    "column": c.target,
                    "path": format!("$.{}", c.source),
                    "datatype": c.column_type.as_str(),
                }),
            })
            .collect();
        serde_json::Value::Array(entries).to_string()
    }
}
