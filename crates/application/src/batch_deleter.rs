use std::collections::HashMap;
use std::sync::Arc;

use ddbtools_core::TableName;
use ddbtools_domain::{BatchOutcome, DeletionSummary, KeyBatch, KeySchema};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::purge_ports::TableProvider;

/// Default number of bulk-delete requests allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Largest in-flight request limit the concurrency limiter supports.
pub const MAX_CONCURRENCY_LIMIT: usize = Semaphore::MAX_PERMITS;

/// Deletes key batches through concurrent bulk-delete requests.
///
/// One task is spawned per batch. A semaphore caps how many of them talk to the
/// provider at the same time. Failures stay inside their batch: they are logged,
/// counted in the returned summary and never retried.
#[derive(Clone)]
pub struct BatchDeleter {
    provider: Arc<dyn TableProvider>,
    max_concurrency: usize,
}

impl BatchDeleter {
    /// Creates a batch deleter with [`DEFAULT_MAX_CONCURRENCY`].
    #[must_use]
    pub fn new(provider: Arc<dyn TableProvider>) -> Self {
        Self {
            provider,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Sets the in-flight request limit, clamped to `1..=MAX_CONCURRENCY_LIMIT`.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.clamp(1, MAX_CONCURRENCY_LIMIT);
        self
    }

    /// Returns the in-flight request limit.
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Deletes every batch and waits until all of them have finished.
    pub async fn delete_all(
        &self,
        table_name: &TableName,
        schema: &KeySchema,
        batches: Vec<KeyBatch>,
    ) -> DeletionSummary {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut join_set = JoinSet::new();
        let mut spawned = HashMap::with_capacity(batches.len());

        for batch in batches {
            let batch_index = batch.index();
            let batch_size = batch.len();
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            let table_name = table_name.clone();
            let schema = schema.clone();

            let handle = join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(error) => {
                        return BatchOutcome::lost(
                            batch_index,
                            batch_size,
                            format!("concurrency limiter closed: {error}"),
                        );
                    }
                };

                delete_batch(provider.as_ref(), &table_name, &schema, batch).await
            });
            spawned.insert(handle.id(), (batch_index, batch_size));
        }

        let mut summary = DeletionSummary::default();
        while let Some(result) = join_set.join_next_with_id().await {
            let outcome = match result {
                Ok((_, outcome)) => outcome,
                Err(join_error) => {
                    let (batch_index, batch_size) = spawned
                        .get(&join_error.id())
                        .copied()
                        .unwrap_or_default();
                    error!(
                        table = %table_name,
                        batch_index,
                        batch_size,
                        error = %join_error,
                        "batch delete task did not complete"
                    );
                    BatchOutcome::lost(batch_index, batch_size, join_error.to_string())
                }
            };
            summary.record(&outcome);
        }

        summary
    }
}

async fn delete_batch(
    provider: &dyn TableProvider,
    table_name: &TableName,
    schema: &KeySchema,
    batch: KeyBatch,
) -> BatchOutcome {
    let batch_index = batch.index();
    let mut outcome = BatchOutcome {
        batch_index,
        attempted: batch.len(),
        ..BatchOutcome::default()
    };

    let mut keys = Vec::with_capacity(batch.len());
    for key in batch.keys() {
        match key.to_key_attributes(schema) {
            Ok(attributes) => keys.push(attributes),
            Err(error) => {
                outcome.skipped += 1;
                warn!(
                    table = %table_name,
                    batch_index,
                    error = %error,
                    "skipping record whose key could not be marshalled"
                );
            }
        }
    }

    if keys.is_empty() {
        warn!(
            table = %table_name,
            batch_index,
            "batch has no deletable keys, no request issued"
        );
        return outcome;
    }

    let requested = keys.len();
    match provider.batch_delete(table_name, keys).await {
        Ok(ack) => {
            outcome.unprocessed = ack.unprocessed.min(requested);
            outcome.deleted = requested - outcome.unprocessed;
            if outcome.unprocessed > 0 {
                warn!(
                    table = %table_name,
                    batch_index,
                    unprocessed = outcome.unprocessed,
                    "provider left delete requests unprocessed"
                );
            } else {
                debug!(
                    table = %table_name,
                    batch_index,
                    deleted = outcome.deleted,
                    "batch deleted"
                );
            }
        }
        Err(error) => {
            outcome.failed = requested;
            error!(
                table = %table_name,
                batch_index,
                batch_size = requested,
                error = %error,
                "batch delete request failed"
            );
            outcome.error = Some(error.to_string());
        }
    }

    outcome
}
