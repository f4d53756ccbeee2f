use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use async_trait::async_trait;
use ddbtools_application::{BatchDeleteAck, ScanPage, ScanRequest, TableProvider};
use ddbtools_core::{AppError, AppResult, TableName};
use ddbtools_domain::{KeyAttributes, KeySchema, KeyTuple, MAX_BATCH_DELETE_ITEMS, ScanCursor};
use tokio::sync::RwLock;

/// Default number of items returned per scan page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug)]
struct InMemoryTable {
    schema: KeySchema,
    items: BTreeMap<KeyAttributes, KeyAttributes>,
}

impl InMemoryTable {
    fn primary_key(&self, item: &KeyAttributes) -> AppResult<KeyAttributes> {
        KeyTuple::from_item(&self.schema, item)
            .and_then(|tuple| tuple.to_key_attributes(&self.schema))
            .map_err(|error| AppError::Validation(format!("invalid item key: {error}")))
    }
}

/// In-memory table provider with a fixed scan page size.
#[derive(Debug)]
pub struct InMemoryTableProvider {
    tables: RwLock<HashMap<String, InMemoryTable>>,
    page_size: usize,
}

impl Default for InMemoryTableProvider {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl InMemoryTableProvider {
    /// Creates an empty provider. A zero page size is raised to one.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            page_size: page_size.max(1),
        }
    }

    /// Creates an empty table.
    pub async fn create_table(&self, table_name: &str, schema: KeySchema) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.contains_key(table_name) {
            return Err(AppError::Validation(format!(
                "table '{table_name}' already exists"
            )));
        }

        tables.insert(
            table_name.to_owned(),
            InMemoryTable {
                schema,
                items: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Inserts or replaces an item. The item must carry every key attribute.
    pub async fn put_item(&self, table_name: &str, item: KeyAttributes) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(table_name)
            .ok_or_else(|| table_missing(table_name))?;
        let key = table.primary_key(&item)?;
        table.items.insert(key, item);
        Ok(())
    }

    /// Returns the number of items stored in a table.
    pub async fn item_count(&self, table_name: &str) -> AppResult<usize> {
        self.tables
            .read()
            .await
            .get(table_name)
            .map(|table| table.items.len())
            .ok_or_else(|| table_missing(table_name))
    }
}

fn table_missing(table_name: &str) -> AppError {
    AppError::SchemaLookup(format!("table '{table_name}' does not exist"))
}

#[async_trait]
impl TableProvider for InMemoryTableProvider {
    async fn describe_key_schema(&self, table_name: &TableName) -> AppResult<KeySchema> {
        self.tables
            .read()
            .await
            .get(table_name.as_str())
            .map(|table| table.schema.clone())
            .ok_or_else(|| table_missing(table_name.as_str()))
    }

    async fn scan_page(
        &self,
        table_name: &TableName,
        request: ScanRequest,
    ) -> AppResult<ScanPage> {
        let tables = self.tables.read().await;
        let table = tables
            .get(table_name.as_str())
            .ok_or_else(|| AppError::Scan(format!("table '{table_name}' does not exist")))?;

        let lower = match &request.cursor {
            Some(cursor) => Bound::Excluded(cursor.attributes()),
            None => Bound::Unbounded,
        };
        let mut page = table
            .items
            .range::<KeyAttributes, _>((lower, Bound::Unbounded))
            .take(self.page_size + 1)
            .collect::<Vec<_>>();
        let has_more = page.len() > self.page_size;
        page.truncate(self.page_size);

        let next_cursor = if has_more {
            page.last()
                .and_then(|(key, _)| ScanCursor::from_last_evaluated_key((*key).clone()))
        } else {
            None
        };
        let items: Vec<KeyAttributes> = page
            .into_iter()
            .map(|(_, item)| {
                item.iter()
                    .filter(|(name, _)| {
                        request.projection.is_empty() || request.projection.contains(*name)
                    })
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect()
            })
            .collect();

        Ok(ScanPage {
            count: items.len(),
            items,
            next_cursor,
        })
    }

    async fn batch_delete(
        &self,
        table_name: &TableName,
        keys: Vec<KeyAttributes>,
    ) -> AppResult<BatchDeleteAck> {
        if keys.is_empty() || keys.len() > MAX_BATCH_DELETE_ITEMS {
            return Err(AppError::BatchDelete(format!(
                "a batch must hold between 1 and {MAX_BATCH_DELETE_ITEMS} keys, got {}",
                keys.len()
            )));
        }

        let mut tables = self.tables.write().await;
        let table = tables.get_mut(table_name.as_str()).ok_or_else(|| {
            AppError::BatchDelete(format!("table '{table_name}' does not exist"))
        })?;

        let primary_keys = keys
            .iter()
            .map(|key| {
                table
                    .primary_key(key)
                    .map_err(|error| AppError::BatchDelete(error.to_string()))
            })
            .collect::<AppResult<Vec<_>>>()?;
        for key in &primary_keys {
            table.items.remove(key);
        }

        Ok(BatchDeleteAck::default())
    }
}
