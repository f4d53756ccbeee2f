//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod dynamodb_table_provider;
mod in_memory_table_provider;

pub use dynamodb_table_provider::DynamoDbTableProvider;
pub use in_memory_table_provider::{DEFAULT_PAGE_SIZE, InMemoryTableProvider};
