//! Domain types for table purges: keys, batches and purge outcomes.

#![forbid(unsafe_code)]

mod batch;
mod key;
mod purge;

pub use batch::{BatchSize, KeyBatch, MAX_BATCH_DELETE_ITEMS, chunk_keys};
pub use key::{KeyAttributes, KeySchema, KeyTuple, KeyValue, ScanCursor};
pub use purge::{BatchOutcome, DeletionSummary, PurgePhase, PurgeReport};
