use thiserror::Error;

/// Configuration could not be resolved from the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    InvalidVar { key: &'static str, reason: String },
}

/// A schema, mapping or source definition violates its invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Table name must not be empty")]
    EmptyTableName,

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Table {0} has no columns")]
    NoColumns(String),

    #[error("Duplicate column {0}")]
    DuplicateColumn(String),

    #[error("Unknown column type: {0}")]
    UnknownColumnType(String),

    #[error("Unknown data format: {0}")]
    UnknownDataFormat(String),

    #[error("Mapping {0} has no columns")]
    EmptyMapping(String),

    #[error("Ordinal {0} is used more than once")]
    DuplicateOrdinal(u32),

    #[error("Column {0} is mapped more than once")]
    DuplicateTarget(String),

    #[error("Mapped column {column} does not exist in table {table}")]
    UnknownTarget { table: String, column: String },

    #[error("Mapped column {column} is {mapped} but the table declares {declared}")]
    TypeMismatch {
        column: String,
        mapped: String,
        declared: String,
    },

    #[error("Invalid source URI: {0}")]
    InvalidSource(String),
}
