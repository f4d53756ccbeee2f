use std::sync::Arc;

use ddbtools_core::{AppError, AppResult, TableName};
use ddbtools_domain::KeySchema;
use tracing::debug;

use crate::purge_ports::TableProvider;

/// Resolves the primary key attribute names of a table.
#[derive(Clone)]
pub struct SchemaResolver {
    provider: Arc<dyn TableProvider>,
}

impl SchemaResolver {
    /// Creates a schema resolver.
    #[must_use]
    pub fn new(provider: Arc<dyn TableProvider>) -> Self {
        Self { provider }
    }

    /// Reads the key schema of `table_name`.
    ///
    /// Every provider failure is reported as [`AppError::SchemaLookup`].
    pub async fn resolve(&self, table_name: &TableName) -> AppResult<KeySchema> {
        let schema = self
            .provider
            .describe_key_schema(table_name)
            .await
            .map_err(|error| match error {
                AppError::SchemaLookup(_) => error,
                other => AppError::SchemaLookup(format!("table '{table_name}': {other}")),
            })?;

        debug!(
            table = %table_name,
            partition_key = schema.partition_key(),
            sort_key = schema.sort_key().unwrap_or("-"),
            composite = schema.is_composite(),
            "resolved key schema"
        );

        Ok(schema)
    }
}
