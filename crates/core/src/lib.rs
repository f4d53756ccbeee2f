//! Shared primitives for all Rust crates in ddbtools.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across ddbtools crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for NonEmptyString {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Name of the table a purge operates on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName(NonEmptyString);

impl TableName {
    /// Parameter name reported when no table name was supplied.
    pub const PARAMETER: &'static str = "table-name";

    /// Creates a table name, rejecting absent or blank input.
    pub fn new(value: Option<&str>) -> AppResult<Self> {
        value
            .and_then(|value| NonEmptyString::new(value).ok())
            .map(Self)
            .ok_or_else(|| AppError::MissingParameter(Self::PARAMETER.to_owned()))
    }

    /// Returns the table name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for TableName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required input parameter was not supplied.
    #[error("Missing parameter \"{0}\"")]
    MissingParameter(String),

    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Table metadata could not be retrieved or lacks a key schema.
    #[error("schema lookup failed: {0}")]
    SchemaLookup(String),

    /// A scan request failed or returned an unusable page.
    #[error("scan failed: {0}")]
    Scan(String),

    /// A bulk-delete request failed.
    #[error("batch delete failed: {0}")]
    BatchDelete(String),

    /// A record key could not be converted into the provider key format.
    #[error("marshal error: {0}")]
    Marshal(String),

    /// Process configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
