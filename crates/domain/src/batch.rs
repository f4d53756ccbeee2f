use ddbtools_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::KeyTuple;

/// Maximum number of delete requests the provider accepts in one bulk call.
pub const MAX_BATCH_DELETE_ITEMS: usize = 25;

/// Validated number of keys per bulk-delete batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSize(usize);

impl BatchSize {
    /// Creates a batch size within `1..=MAX_BATCH_DELETE_ITEMS`.
    pub fn new(value: usize) -> AppResult<Self> {
        if value == 0 || value > MAX_BATCH_DELETE_ITEMS {
            return Err(AppError::Validation(format!(
                "batch size must be between 1 and {MAX_BATCH_DELETE_ITEMS}, got {value}"
            )));
        }

        Ok(Self(value))
    }

    /// Returns the size as a plain integer.
    #[must_use]
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        Self(MAX_BATCH_DELETE_ITEMS)
    }
}

/// Contiguous group of keys deleted by one bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBatch {
    index: usize,
    keys: Vec<KeyTuple>,
}

impl KeyBatch {
    /// Returns the zero-based position of the batch in the purge.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the keys in the batch.
    #[must_use]
    pub fn keys(&self) -> &[KeyTuple] {
        &self.keys
    }

    /// Returns the number of keys in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns whether the batch holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Consumes the batch and returns its keys.
    #[must_use]
    pub fn into_keys(self) -> Vec<KeyTuple> {
        self.keys
    }
}

/// Splits `keys` into batches of exactly `size` keys, except the last one which
/// holds the remainder. Empty input yields no batches.
#[must_use]
pub fn chunk_keys(keys: Vec<KeyTuple>, size: BatchSize) -> Vec<KeyBatch> {
    let size = size.get();
    let mut batches = Vec::with_capacity(keys.len().div_ceil(size));
    let mut remaining = keys.into_iter().peekable();

    while remaining.peek().is_some() {
        let keys: Vec<KeyTuple> = remaining.by_ref().take(size).collect();
        batches.push(KeyBatch {
            index: batches.len(),
            keys,
        });
    }

    batches
}
