//! Table and mapping provisioning.

use std::sync::Arc;

use tracing::{debug, info, warn};

use adx_core::{IngestionMapping, SchemaDefinition};

use crate::client::{ClientError, ControlPlaneClient};
use crate::commands;
use crate::error::ProvisionError;

/// How an existing table is treated before (re)creating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionMode {
    /// Best-effort drop, then create. Existing data is lost.
    Reset,
    /// Create-merge: adds missing columns and keeps data.
    Merge,
}

/// Issues the management commands that make a table and its mapping exist.
///
/// Calling [`ensure_schema`](Self::ensure_schema) repeatedly with the same
/// definitions is safe. Failures are never retried here: they are structural
/// (bad schema, missing permissions) and the caller decides what to do.
pub struct SchemaProvisioner {
    client: Arc<dyn ControlPlaneClient>,
    database: String,
    mode: ProvisionMode,
}

impl SchemaProvisioner {
    pub fn new(client: Arc<dyn ControlPlaneClient>, database: impl Into<String>, mode: ProvisionMode) -> Self {
        Self {
            client,
            database: database.into(),
            mode,
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub async fn ensure_schema(
        &self,
        schema: &SchemaDefinition,
        mapping: &IngestionMapping,
    ) -> Result<(), ProvisionError> {
        let table = schema.table();

        mapping
            .validate_against(schema)
            .map_err(|source| ProvisionError::InvalidMapping {
                table: table.to_string(),
                mapping: mapping.name().to_string(),
                source,
            })?;

        let create = match self.mode {
            ProvisionMode::Reset => {
                self.drop_table(table).await;
                commands::create_table(schema)
            }
            ProvisionMode::Merge => commands::create_merge_table(schema),
        };

        self.client
            .execute(&self.database, &create)
            .await
            .map_err(|source| ProvisionError::CreateFailed {
                table: table.to_string(),
                source,
            })?;
        info!(table = %table, columns = schema.columns().len(), "Table created");

        self.client
            .execute(&self.database, &commands::create_mapping(table, mapping))
            .await
            .map_err(|source| ProvisionError::MappingFailed {
                table: table.to_string(),
                mapping: mapping.name().to_string(),
                source,
            })?;
        info!(table = %table, mapping = %mapping.name(), kind = %mapping.kind(), "Mapping created");

        Ok(())
    }

    /// Drop failures never stop provisioning; the create that follows reports
    /// anything that actually matters.
    async fn drop_table(&self, table: &str) {
        match self.client.execute(&self.database, &commands::drop_table(table)).await {
            Ok(_) => info!(table = %table, "Table dropped"),
            Err(ClientError::NotFound(_)) => debug!(table = %table, "Table absent, nothing to drop"),
            Err(e) => warn!(table = %table, error = %e, "Failed to drop table, continuing"),
        }
    }
}
