use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest, KeyType, WriteRequest};
use ddbtools_application::{BatchDeleteAck, ScanPage, ScanRequest, TableProvider};
use ddbtools_core::{AppError, AppResult, TableName};
use ddbtools_domain::{KeyAttributes, KeySchema, KeyValue, ScanCursor};
use tracing::{debug, warn};

/// DynamoDB implementation of the table provider port.
#[derive(Clone)]
pub struct DynamoDbTableProvider {
    client: Client,
}

impl DynamoDbTableProvider {
    /// Creates a provider over an already configured DynamoDB client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TableProvider for DynamoDbTableProvider {
    async fn describe_key_schema(&self, table_name: &TableName) -> AppResult<KeySchema> {
        let output = self
            .client
            .describe_table()
            .table_name(table_name.as_str())
            .send()
            .await
            .map_err(|error| {
                let table_missing = error
                    .as_service_error()
                    .is_some_and(|service_error| service_error.is_resource_not_found_exception());
                if table_missing {
                    AppError::SchemaLookup(format!("table '{table_name}' does not exist"))
                } else {
                    AppError::SchemaLookup(format!(
                        "failed to describe table '{table_name}': {}",
                        DisplayErrorContext(&error)
                    ))
                }
            })?;

        let table = output.table().ok_or_else(|| {
            AppError::SchemaLookup(format!("table '{table_name}' returned no description"))
        })?;

        let mut partition_key = None;
        let mut sort_key = None;
        for element in table.key_schema() {
            match element.key_type() {
                KeyType::Hash => partition_key = Some(element.attribute_name().to_owned()),
                KeyType::Range => sort_key = Some(element.attribute_name().to_owned()),
                other => warn!(
                    table = %table_name,
                    attribute = element.attribute_name(),
                    key_type = other.as_str(),
                    "ignoring unknown key type"
                ),
            }
        }

        let partition_key = partition_key.ok_or_else(|| {
            AppError::SchemaLookup(format!("table '{table_name}' has no partition key"))
        })?;

        KeySchema::new(partition_key, sort_key)
            .map_err(|error| AppError::SchemaLookup(format!("table '{table_name}': {error}")))
    }

    async fn scan_page(
        &self,
        table_name: &TableName,
        request: ScanRequest,
    ) -> AppResult<ScanPage> {
        let mut scan = self
            .client
            .scan()
            .table_name(table_name.as_str())
            .set_exclusive_start_key(
                request
                    .cursor
                    .as_ref()
                    .map(|cursor| to_attribute_map(cursor.attributes())),
            );

        if !request.projection.is_empty() {
            let (expression, names) = projection_expression(&request.projection);
            scan = scan
                .projection_expression(expression)
                .set_expression_attribute_names(Some(names));
        }

        let output = scan.send().await.map_err(|error| {
            AppError::Scan(format!(
                "failed to scan table '{table_name}': {}",
                DisplayErrorContext(&error)
            ))
        })?;

        let items = output
            .items()
            .iter()
            .map(from_attribute_map)
            .collect::<AppResult<Vec<_>>>()?;
        let next_cursor = match output.last_evaluated_key() {
            Some(last_evaluated_key) => {
                ScanCursor::from_last_evaluated_key(from_attribute_map(last_evaluated_key)?)
            }
            None => None,
        };
        let count = usize::try_from(output.count()).unwrap_or(items.len());

        debug!(
            table = %table_name,
            count,
            has_more = next_cursor.is_some(),
            "received scan page"
        );

        Ok(ScanPage {
            items,
            next_cursor,
            count,
        })
    }

    async fn batch_delete(
        &self,
        table_name: &TableName,
        keys: Vec<KeyAttributes>,
    ) -> AppResult<BatchDeleteAck> {
        let write_requests = keys
            .iter()
            .map(|key| {
                DeleteRequest::builder()
                    .set_key(Some(to_attribute_map(key)))
                    .build()
                    .map(|delete_request| {
                        WriteRequest::builder()
                            .delete_request(delete_request)
                            .build()
                    })
                    .map_err(|error| {
                        AppError::Marshal(format!("failed to build delete request: {error}"))
                    })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let output = self
            .client
            .batch_write_item()
            .request_items(table_name.as_str(), write_requests)
            .send()
            .await
            .map_err(|error| {
                AppError::BatchDelete(format!(
                    "failed to delete {} items from '{table_name}': {}",
                    keys.len(),
                    DisplayErrorContext(&error)
                ))
            })?;

        let unprocessed = output
            .unprocessed_items()
            .and_then(|unprocessed| unprocessed.get(table_name.as_str()))
            .map_or(0, Vec::len);

        Ok(BatchDeleteAck { unprocessed })
    }
}

fn projection_expression(attribute_names: &[String]) -> (String, HashMap<String, String>) {
    let placeholders: Vec<String> = (0..attribute_names.len())
        .map(|index| format!("#k{index}"))
        .collect();
    let names = placeholders
        .iter()
        .cloned()
        .zip(attribute_names.iter().cloned())
        .collect();

    (placeholders.join(", "), names)
}

fn to_attribute_value(value: &KeyValue) -> AttributeValue {
    match value {
        KeyValue::String(value) => AttributeValue::S(value.clone()),
        KeyValue::Number(value) => AttributeValue::N(value.clone()),
        KeyValue::Binary(value) => AttributeValue::B(Blob::new(value.clone())),
    }
}

fn to_attribute_map(attributes: &KeyAttributes) -> HashMap<String, AttributeValue> {
    attributes
        .iter()
        .map(|(name, value)| (name.clone(), to_attribute_value(value)))
        .collect()
}

fn from_attribute_value(name: &str, value: &AttributeValue) -> AppResult<KeyValue> {
    match value {
        AttributeValue::S(value) => Ok(KeyValue::String(value.clone())),
        AttributeValue::N(value) => Ok(KeyValue::Number(value.clone())),
        AttributeValue::B(value) => Ok(KeyValue::Binary(value.clone().into_inner())),
        _ => Err(AppError::Scan(format!(
            "attribute '{name}' is not a string, number or binary key value"
        ))),
    }
}

fn from_attribute_map(attributes: &HashMap<String, AttributeValue>) -> AppResult<KeyAttributes> {
    attributes
        .iter()
        .map(|(name, value)| from_attribute_value(name, value).map(|value| (name.clone(), value)))
        .collect()
}
