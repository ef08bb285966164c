//! Management command text for the operations the core issues.

use adx_core::{IngestionMapping, SchemaDefinition, SourceLocation};

use crate::client::IngestionParameters;

/// Single-quoted string literal with backslash escapes.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Bracketed entity name, safe for any table name.
pub fn quote_entity(name: &str) -> String {
    format!("[{}]", quote_literal(name))
}

pub fn drop_table(table: &str) -> String {
    format!(".drop table {} ifexists", quote_entity(table))
}

pub fn create_table(schema: &SchemaDefinition) -> String {
    format!(".create table {} ({})", quote_entity(schema.table()), schema.column_list())
}

/// Adds missing columns, keeps existing data.
pub fn create_merge_table(schema: &SchemaDefinition) -> String {
    format!(".create-merge table {} ({})", quote_entity(schema.table()), schema.column_list())
}

pub fn create_mapping(table: &str, mapping: &IngestionMapping) -> String {
    format!(
        ".create-or-alter table {} ingestion {} mapping {} {}",
        quote_entity(table),
        mapping.kind(),
        quote_literal(mapping.name()),
        quote_literal(&mapping.to_json()),
    )
}

/// Queue a blob for ingestion and return immediately with an operation id.
///
/// The URI is passed as an obfuscated literal so the service keeps the token
/// out of its own command logs.
pub fn ingest_async(source: &SourceLocation, params: &IngestionParameters) -> String {
    let mut properties = vec![
        format!("format={}", quote_literal(params.format.as_str())),
        format!("ingestionMappingReference={}", quote_literal(&params.mapping_reference)),
        format!("ingestionMappingType={}", quote_literal(params.mapping_kind.as_str())),
        format!("reportLevel={}", quote_literal(params.report_level.as_str())),
        format!("reportMethod={}", quote_literal(params.report_method.as_str())),
    ];
    if !params.tags.is_empty() {
        let tags = serde_json::to_string(&params.tags).unwrap_or_else(|_| "[]".to_string());
        properties.push(format!("tags={}", quote_literal(&tags)));
    }
    format!(
        ".ingest async into table {} (h{}) with ({})",
        quote_entity(&params.table),
        quote_literal(&source.expose_uri()),
        properties.join(", "),
    )
}

pub fn show_operation(operation_id: &str) -> String {
    format!(".show operations {}", operation_id)
}

/// Operation ids are GUIDs; anything else is refused before it reaches a command.
pub fn is_valid_operation_id(operation_id: &str) -> bool {
    uuid::Uuid::parse_str(operation_id).is_ok()
}
