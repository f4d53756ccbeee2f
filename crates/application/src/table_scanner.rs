use std::sync::Arc;

use ddbtools_core::{AppError, AppResult, TableName};
use ddbtools_domain::{KeySchema, KeyTuple};
use tracing::debug;

use crate::purge_ports::{ScanRequest, TableProvider};

/// Keys collected by a full table scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedKeys {
    /// Record keys in page order.
    pub keys: Vec<KeyTuple>,
    /// Sum of the per-page item counts reported by the provider.
    pub count: usize,
    /// Number of pages read.
    pub pages: usize,
}

/// Enumerates every record key of a table through a sequential paginated scan.
#[derive(Clone)]
pub struct TableScanner {
    provider: Arc<dyn TableProvider>,
}

impl TableScanner {
    /// Creates a table scanner.
    #[must_use]
    pub fn new(provider: Arc<dyn TableProvider>) -> Self {
        Self { provider }
    }

    /// Scans `table_name` to exhaustion, projecting only the attributes of `schema`.
    ///
    /// Any failed page aborts the whole scan and no keys are returned.
    pub async fn scan_keys(
        &self,
        table_name: &TableName,
        schema: &KeySchema,
    ) -> AppResult<ScannedKeys> {
        let projection: Vec<String> = schema
            .attribute_names()
            .into_iter()
            .map(str::to_owned)
            .collect();
        let mut scanned = ScannedKeys::default();
        let mut cursor = None;

        loop {
            let page = self
                .provider
                .scan_page(
                    table_name,
                    ScanRequest {
                        cursor: cursor.take(),
                        projection: projection.clone(),
                    },
                )
                .await
                .map_err(|error| match error {
                    AppError::Scan(_) => error,
                    other => AppError::Scan(format!("table '{table_name}': {other}")),
                })?;

            scanned.pages += 1;
            scanned.count += page.count;
            scanned.keys.reserve(page.items.len());
            for item in &page.items {
                scanned.keys.push(KeyTuple::from_item(schema, item)?);
            }

            debug!(
                table = %table_name,
                page = scanned.pages,
                page_items = page.items.len(),
                total_items = scanned.count,
                "scanned page"
            );

            match page.next_cursor {
                Some(next_cursor) => cursor = Some(next_cursor),
                None => break,
            }
        }

        Ok(scanned)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ddbtools_core::{AppError, TableName};
    use ddbtools_domain::{KeyTuple, KeyValue};

    use super::TableScanner;
    use crate::test_support::{
        FakeTableProvider, composite_items, composite_schema, simple_items, simple_schema,
    };

    fn table_name() -> TableName {
        TableName::new(Some("events")).unwrap_or_else(|_| unreachable!())
    }

    #[tokio::test]
    async fn scan_concatenates_pages_in_order() {
        let schema = simple_schema();
        let items = simple_items(23);
        let provider = Arc::new(FakeTableProvider::new(schema.clone(), items.clone(), 5));
        let scanner = TableScanner::new(provider.clone());

        let scanned = scanner.scan_keys(&table_name(), &schema).await;
        assert!(scanned.is_ok());
        let scanned = scanned.unwrap_or_default();

        let expected: Vec<KeyTuple> = items
            .iter()
            .map(|item| KeyTuple::from_item(&schema, item).unwrap_or_else(|_| unreachable!()))
            .collect();
        assert_eq!(scanned.keys, expected);
        assert_eq!(scanned.count, 23);
        assert_eq!(scanned.pages, 5);

        let requests = provider.scan_requests().await;
        assert_eq!(requests.len(), 5);
        assert!(requests[0].cursor.is_none());
        assert!(requests[1..].iter().all(|request| request.cursor.is_some()));
    }

    #[tokio::test]
    async fn scan_projects_only_key_attributes() {
        let schema = composite_schema();
        let provider = Arc::new(FakeTableProvider::new(
            schema.clone(),
            composite_items(3, 2),
            100,
        ));
        let scanner = TableScanner::new(provider.clone());

        let scanned = scanner
            .scan_keys(&table_name(), &schema)
            .await
            .unwrap_or_default();
        assert_eq!(scanned.keys.len(), 6);
        assert!(scanned.keys.iter().all(|key| key.sort().is_some()));

        let requests = provider.scan_requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].projection, vec!["tenant", "ts"]);
    }

    #[tokio::test]
    async fn empty_table_scans_one_page() {
        let schema = simple_schema();
        let provider = Arc::new(FakeTableProvider::new(schema.clone(), Vec::new(), 10));
        let scanner = TableScanner::new(provider);

        let scanned = scanner
            .scan_keys(&table_name(), &schema)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(scanned.keys.is_empty());
        assert_eq!(scanned.count, 0);
        assert_eq!(scanned.pages, 1);
    }

    #[tokio::test]
    async fn failing_page_aborts_whole_scan() {
        let schema = simple_schema();
        let provider = Arc::new(
            FakeTableProvider::new(schema.clone(), simple_items(30), 10).failing_scan_at(2),
        );
        let scanner = TableScanner::new(provider.clone());

        let result = scanner.scan_keys(&table_name(), &schema).await;
        assert!(matches!(result, Err(AppError::Scan(_))));
        assert_eq!(provider.scan_requests().await.len(), 3);
    }

    #[tokio::test]
    async fn item_without_partition_key_fails_scan() {
        let schema = simple_schema();
        let mut items = simple_items(3);
        items[1].clear();
        items[1].insert("other".to_owned(), KeyValue::String("x".to_owned()));
        let provider = Arc::new(FakeTableProvider::new(schema.clone(), items, 10));
        let scanner = TableScanner::new(provider);

        let result = scanner.scan_keys(&table_name(), &schema).await;
        assert!(matches!(result, Err(AppError::Scan(_))));
    }
}
