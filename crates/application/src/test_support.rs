use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use ddbtools_core::{AppError, AppResult, TableName};
use ddbtools_domain::{KeyAttributes, KeySchema, KeyValue, ScanCursor};
use tokio::sync::Mutex;

use crate::purge_ports::{BatchDeleteAck, ScanPage, ScanRequest, TableProvider};

const PAGE_CURSOR_ATTRIBUTE: &str = "__page";

pub(crate) fn simple_schema() -> KeySchema {
    KeySchema::new("id", None).unwrap_or_else(|_| unreachable!())
}

pub(crate) fn composite_schema() -> KeySchema {
    KeySchema::new("tenant", Some("ts".to_owned())).unwrap_or_else(|_| unreachable!())
}

/// Items keyed by `id`, each with an extra non-key attribute.
pub(crate) fn simple_items(count: usize) -> Vec<KeyAttributes> {
    (0..count)
        .map(|index| {
            KeyAttributes::from([
                ("id".to_owned(), KeyValue::String(format!("item-{index:03}"))),
                (
                    "payload".to_owned(),
                    KeyValue::String(format!("payload-{index}")),
                ),
            ])
        })
        .collect()
}

/// Items keyed by `tenant` and `ts`.
pub(crate) fn composite_items(tenants: usize, per_tenant: usize) -> Vec<KeyAttributes> {
    (0..tenants)
        .flat_map(|tenant| {
            (0..per_tenant).map(move |offset| {
                KeyAttributes::from([
                    (
                        "tenant".to_owned(),
                        KeyValue::String(format!("tenant-{tenant}")),
                    ),
                    (
                        "ts".to_owned(),
                        KeyValue::Number((1_700_000_000 + offset).to_string()),
                    ),
                    ("body".to_owned(), KeyValue::Binary(vec![1, 2, 3])),
                ])
            })
        })
        .collect()
}

#[derive(Default)]
struct RecordedCalls {
    describe_calls: usize,
    scan_requests: Vec<ScanRequest>,
    delete_requests: Vec<Vec<KeyAttributes>>,
    completed_deletes: usize,
    in_flight: usize,
    max_in_flight: usize,
}

/// Scriptable provider that records every call it receives.
pub(crate) struct FakeTableProvider {
    schema: Option<KeySchema>,
    items: Vec<KeyAttributes>,
    page_size: usize,
    failing_scan_page: Option<usize>,
    failing_partitions: HashSet<KeyValue>,
    panicking_partitions: HashSet<KeyValue>,
    delays: HashMap<KeyValue, Duration>,
    delete_delay: Duration,
    unprocessed_per_request: usize,
    calls: Mutex<RecordedCalls>,
}

impl FakeTableProvider {
    pub(crate) fn new(schema: KeySchema, items: Vec<KeyAttributes>, page_size: usize) -> Self {
        Self {
            schema: Some(schema),
            items,
            page_size: page_size.max(1),
            failing_scan_page: None,
            failing_partitions: HashSet::new(),
            panicking_partitions: HashSet::new(),
            delays: HashMap::new(),
            delete_delay: Duration::ZERO,
            unprocessed_per_request: 0,
            calls: Mutex::new(RecordedCalls::default()),
        }
    }

    pub(crate) fn without_table() -> Self {
        Self {
            schema: None,
            ..Self::new(simple_schema(), Vec::new(), 1)
        }
    }

    pub(crate) fn failing_scan_at(mut self, page: usize) -> Self {
        self.failing_scan_page = Some(page);
        self
    }

    /// Fails every delete request that contains `partition`.
    pub(crate) fn failing_delete_for(mut self, partition: KeyValue) -> Self {
        self.failing_partitions.insert(partition);
        self
    }

    /// Panics inside every delete request that contains `partition`.
    pub(crate) fn panicking_delete_for(mut self, partition: KeyValue) -> Self {
        self.panicking_partitions.insert(partition);
        self
    }

    /// Delays the delete request whose first key has `partition`.
    pub(crate) fn delaying_delete_for(mut self, partition: KeyValue, delay: Duration) -> Self {
        self.delays.insert(partition, delay);
        self
    }

    pub(crate) fn with_delete_delay(mut self, delay: Duration) -> Self {
        self.delete_delay = delay;
        self
    }

    pub(crate) fn leaving_unprocessed(mut self, count: usize) -> Self {
        self.unprocessed_per_request = count;
        self
    }

    pub(crate) async fn describe_calls(&self) -> usize {
        self.calls.lock().await.describe_calls
    }

    pub(crate) async fn scan_requests(&self) -> Vec<ScanRequest> {
        self.calls.lock().await.scan_requests.clone()
    }

    pub(crate) async fn delete_requests(&self) -> Vec<Vec<KeyAttributes>> {
        self.calls.lock().await.delete_requests.clone()
    }

    pub(crate) async fn completed_deletes(&self) -> usize {
        self.calls.lock().await.completed_deletes
    }

    pub(crate) async fn max_in_flight(&self) -> usize {
        self.calls.lock().await.max_in_flight
    }

    pub(crate) async fn total_calls(&self) -> usize {
        let calls = self.calls.lock().await;
        calls.describe_calls + calls.scan_requests.len() + calls.delete_requests.len()
    }

    fn partition_of<'a>(&self, key: &'a KeyAttributes) -> Option<&'a KeyValue> {
        let schema = self.schema.as_ref()?;
        key.get(schema.partition_key())
    }
}

fn page_index(cursor: Option<&ScanCursor>) -> usize {
    cursor
        .and_then(|cursor| cursor.attributes().get(PAGE_CURSOR_ATTRIBUTE))
        .and_then(|value| match value {
            KeyValue::Number(number) => number.parse().ok(),
            _ => None,
        })
        .unwrap_or(0)
}

#[async_trait]
impl TableProvider for FakeTableProvider {
    async fn describe_key_schema(&self, table_name: &TableName) -> AppResult<KeySchema> {
        self.calls.lock().await.describe_calls += 1;
        self.schema.clone().ok_or_else(|| {
            AppError::SchemaLookup(format!("table '{table_name}' does not exist"))
        })
    }

    async fn scan_page(
        &self,
        _table_name: &TableName,
        request: ScanRequest,
    ) -> AppResult<ScanPage> {
        let page = page_index(request.cursor.as_ref());
        let projection = request.projection.clone();
        self.calls.lock().await.scan_requests.push(request);

        if self.failing_scan_page == Some(page) {
            return Err(AppError::Scan(format!("page {page} unavailable")));
        }

        let start = page * self.page_size;
        let end = (start + self.page_size).min(self.items.len());
        let items: Vec<KeyAttributes> = self.items[start.min(end)..end]
            .iter()
            .map(|item| {
                item.iter()
                    .filter(|(name, _)| projection.contains(*name))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect()
            })
            .collect();
        let next_cursor = (end < self.items.len())
            .then(|| {
                ScanCursor::from_last_evaluated_key(KeyAttributes::from([(
                    PAGE_CURSOR_ATTRIBUTE.to_owned(),
                    KeyValue::Number((page + 1).to_string()),
                )]))
            })
            .flatten();

        Ok(ScanPage {
            count: items.len(),
            items,
            next_cursor,
        })
    }

    async fn batch_delete(
        &self,
        _table_name: &TableName,
        keys: Vec<KeyAttributes>,
    ) -> AppResult<BatchDeleteAck> {
        let delay = keys
            .first()
            .and_then(|key| self.partition_of(key))
            .and_then(|partition| self.delays.get(partition))
            .copied()
            .unwrap_or(self.delete_delay);
        let fails = keys.iter().any(|key| {
            self.partition_of(key)
                .is_some_and(|partition| self.failing_partitions.contains(partition))
        });
        let panics = keys.iter().any(|key| {
            self.partition_of(key)
                .is_some_and(|partition| self.panicking_partitions.contains(partition))
        });
        let requested = keys.len();

        self.calls.lock().await.delete_requests.push(keys);
        if panics {
            panic!("delete handler crashed on a batch of {requested} keys");
        }

        {
            let mut calls = self.calls.lock().await;
            calls.in_flight += 1;
            calls.max_in_flight = calls.max_in_flight.max(calls.in_flight);
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut calls = self.calls.lock().await;
        calls.in_flight -= 1;
        calls.completed_deletes += 1;

        if fails {
            return Err(AppError::BatchDelete(
                "provisioned throughput exceeded".to_owned(),
            ));
        }

        Ok(BatchDeleteAck {
            unprocessed: self.unprocessed_per_request.min(requested),
        })
    }
}
