//! Application services and ports.

#![forbid(unsafe_code)]

mod batch_deleter;
mod purge_ports;
mod purge_service;
mod schema_resolver;
mod table_scanner;

#[cfg(test)]
mod test_support;

pub use batch_deleter::{BatchDeleter, DEFAULT_MAX_CONCURRENCY, MAX_CONCURRENCY_LIMIT};
pub use purge_ports::{BatchDeleteAck, ScanPage, ScanRequest, TableProvider};
pub use purge_service::PurgeService;
pub use schema_resolver::SchemaResolver;
pub use table_scanner::{ScannedKeys, TableScanner};
