use std::sync::Arc;

use ddbtools_core::{AppError, AppResult, TableName};
use ddbtools_domain::{BatchSize, PurgePhase, PurgeReport, chunk_keys};
use tracing::{error, info};

use crate::batch_deleter::BatchDeleter;
use crate::purge_ports::TableProvider;
use crate::schema_resolver::SchemaResolver;
use crate::table_scanner::TableScanner;

/// Empties a table by deleting every record while keeping the table itself.
#[derive(Clone)]
pub struct PurgeService {
    schema_resolver: SchemaResolver,
    table_scanner: TableScanner,
    batch_deleter: BatchDeleter,
    batch_size: BatchSize,
}

impl PurgeService {
    /// Creates a purge service over one provider handle.
    #[must_use]
    pub fn new(provider: Arc<dyn TableProvider>) -> Self {
        Self {
            schema_resolver: SchemaResolver::new(Arc::clone(&provider)),
            table_scanner: TableScanner::new(Arc::clone(&provider)),
            batch_deleter: BatchDeleter::new(provider),
            batch_size: BatchSize::default(),
        }
    }

    /// Overrides the number of keys per bulk-delete request.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: BatchSize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Overrides the number of bulk-delete requests allowed in flight.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.batch_deleter = self.batch_deleter.with_max_concurrency(max_concurrency);
        self
    }

    /// Deletes every record of `table_name`.
    ///
    /// Schema and scan failures abort the purge before anything is deleted.
    /// Deletion failures never fail the purge; they are reported in
    /// [`PurgeReport::deletion`] while [`PurgeReport::observed_items`] keeps the
    /// scanned count.
    pub async fn purge(&self, table_name: Option<&str>) -> AppResult<PurgeReport> {
        let table_name = TableName::new(table_name)?;
        let phase = advance(PurgePhase::Idle, PurgePhase::ResolvingSchema, &table_name)?;

        let schema = match self.schema_resolver.resolve(&table_name).await {
            Ok(schema) => schema,
            Err(error) => return Err(fail(phase, &table_name, error)),
        };

        let phase = advance(phase, PurgePhase::Scanning, &table_name)?;
        let scanned = match self.table_scanner.scan_keys(&table_name, &schema).await {
            Ok(scanned) => scanned,
            Err(error) => return Err(fail(phase, &table_name, error)),
        };
        info!(
            table = %table_name,
            items = scanned.count,
            pages = scanned.pages,
            "scan complete"
        );

        let phase = advance(phase, PurgePhase::Deleting, &table_name)?;
        let batches = chunk_keys(scanned.keys, self.batch_size);
        info!(
            table = %table_name,
            batches = batches.len(),
            max_concurrency = self.batch_deleter.max_concurrency(),
            "deleting batches"
        );
        let deletion = self
            .batch_deleter
            .delete_all(&table_name, &schema, batches)
            .await;

        advance(phase, PurgePhase::Done, &table_name)?;
        info!(
            table = %table_name,
            observed = scanned.count,
            deleted = deletion.items_deleted,
            remaining = deletion.items_remaining(),
            failed_batches = deletion.batches_failed,
            "purge finished"
        );

        Ok(PurgeReport::new(
            table_name.as_str(),
            scanned.count,
            deletion,
        ))
    }
}

fn advance(phase: PurgePhase, next: PurgePhase, table_name: &TableName) -> AppResult<PurgePhase> {
    let next = phase.transition(next)?;
    info!(
        table = %table_name,
        phase = next.as_str(),
        terminal = next.is_terminal(),
        "purge phase changed"
    );
    Ok(next)
}

fn fail(phase: PurgePhase, table_name: &TableName, error: AppError) -> AppError {
    match phase.transition(PurgePhase::Failed) {
        Ok(_) => {
            error!(
                table = %table_name,
                phase = phase.as_str(),
                error = %error,
                "purge failed"
            );
            error
        }
        Err(transition_error) => transition_error,
    }
}
