use async_trait::async_trait;
use ddbtools_core::{AppResult, TableName};
use ddbtools_domain::{KeyAttributes, KeySchema, ScanCursor};

/// One scan request against the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// Cursor returned by the previous page, `None` for the first page.
    pub cursor: Option<ScanCursor>,
    /// Attribute names to project; only key attributes are requested.
    pub projection: Vec<String>,
}

/// One page of scan results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Projected items in provider order.
    pub items: Vec<KeyAttributes>,
    /// Cursor for the next page; `None` once the table is exhausted.
    pub next_cursor: Option<ScanCursor>,
    /// Item count reported by the provider for this page.
    pub count: usize,
}

/// Provider acknowledgement of a bulk-delete request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchDeleteAck {
    /// Number of delete requests the provider returned as unprocessed.
    pub unprocessed: usize,
}

/// Port for the managed key-value store holding the table being purged.
///
/// Implementations are shared read-only by every concurrent delete task.
#[async_trait]
pub trait TableProvider: Send + Sync {
    /// Reads the table's primary key schema.
    async fn describe_key_schema(&self, table_name: &TableName) -> AppResult<KeySchema>;

    /// Reads one page of the table, projecting only the requested attributes.
    async fn scan_page(&self, table_name: &TableName, request: ScanRequest)
    -> AppResult<ScanPage>;

    /// Deletes the given keys in one bulk request.
    async fn batch_delete(
        &self,
        table_name: &TableName,
        keys: Vec<KeyAttributes>,
    ) -> AppResult<BatchDeleteAck>;
}
