use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use ddbtools_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Attribute map holding only the key attributes of one record.
pub type KeyAttributes = BTreeMap<String, KeyValue>;

/// Scalar value of a key attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyValue {
    /// UTF-8 string value.
    String(String),
    /// Number in the provider's decimal text encoding.
    Number(String),
    /// Raw binary value.
    Binary(Vec<u8>),
}

impl KeyValue {
    /// Returns the provider type descriptor for the value.
    #[must_use]
    pub fn type_descriptor(&self) -> &'static str {
        match self {
            Self::String(_) => "S",
            Self::Number(_) => "N",
            Self::Binary(_) => "B",
        }
    }

    fn validate_as_key(&self, attribute_name: &str) -> AppResult<()> {
        let is_valid = match self {
            Self::String(value) => !value.is_empty(),
            Self::Number(value) => is_decimal_text(value),
            Self::Binary(value) => !value.is_empty(),
        };

        if !is_valid {
            return Err(AppError::Marshal(format!(
                "attribute '{attribute_name}' holds an invalid {} key value",
                self.type_descriptor()
            )));
        }

        Ok(())
    }
}

impl Display for KeyValue {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(value) | Self::Number(value) => formatter.write_str(value),
            Self::Binary(value) => write!(formatter, "<{} bytes>", value.len()),
        }
    }
}

fn is_decimal_text(value: &str) -> bool {
    let digits = value.strip_prefix(['-', '+']).unwrap_or(value);
    let (mantissa, exponent) = match digits.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (digits, None),
    };
    let mut parts = mantissa.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next().unwrap_or_default();

    let mantissa_is_valid = !(whole.is_empty() && fraction.is_empty())
        && whole.chars().all(|character| character.is_ascii_digit())
        && fraction.chars().all(|character| character.is_ascii_digit());
    let exponent_is_valid = exponent.is_none_or(|exponent| {
        let exponent = exponent.strip_prefix(['-', '+']).unwrap_or(exponent);
        !exponent.is_empty() && exponent.chars().all(|character| character.is_ascii_digit())
    });

    mantissa_is_valid && exponent_is_valid
}

/// Primary key attribute names of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchema {
    partition_key: NonEmptyString,
    sort_key: Option<NonEmptyString>,
}

impl KeySchema {
    /// Creates a key schema from a partition key name and optional sort key name.
    pub fn new(partition_key: impl Into<String>, sort_key: Option<String>) -> AppResult<Self> {
        let partition_key = NonEmptyString::new(partition_key).map_err(|_| {
            AppError::Validation("partition key name must not be empty".to_owned())
        })?;
        let sort_key = sort_key
            .map(|name| {
                NonEmptyString::new(name).map_err(|_| {
                    AppError::Validation("sort key name must not be empty".to_owned())
                })
            })
            .transpose()?;

        if sort_key.as_ref() == Some(&partition_key) {
            return Err(AppError::Validation(format!(
                "sort key must differ from partition key '{partition_key}'"
            )));
        }

        Ok(Self {
            partition_key,
            sort_key,
        })
    }

    /// Returns the partition key attribute name.
    #[must_use]
    pub fn partition_key(&self) -> &str {
        self.partition_key.as_str()
    }

    /// Returns the sort key attribute name when the table has a composite key.
    #[must_use]
    pub fn sort_key(&self) -> Option<&str> {
        self.sort_key.as_ref().map(NonEmptyString::as_str)
    }

    /// Returns whether the key is composite.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.sort_key.is_some()
    }

    /// Returns all key attribute names, partition key first.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<&str> {
        std::iter::once(self.partition_key())
            .chain(self.sort_key())
            .collect()
    }
}

/// Identity of one record: partition value plus optional sort value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyTuple {
    partition: KeyValue,
    sort: Option<KeyValue>,
}

impl KeyTuple {
    /// Creates a key tuple.
    #[must_use]
    pub fn new(partition: KeyValue, sort: Option<KeyValue>) -> Self {
        Self { partition, sort }
    }

    /// Extracts the key tuple named by `schema` from a scanned item.
    ///
    /// The partition attribute is mandatory. A missing sort attribute leaves the
    /// tuple without a sort value; it is rejected later by [`KeyTuple::to_key_attributes`].
    pub fn from_item(schema: &KeySchema, item: &KeyAttributes) -> AppResult<Self> {
        let partition = item.get(schema.partition_key()).cloned().ok_or_else(|| {
            AppError::Scan(format!(
                "scanned item is missing partition key attribute '{}'",
                schema.partition_key()
            ))
        })?;
        let sort = schema.sort_key().and_then(|name| item.get(name).cloned());

        Ok(Self { partition, sort })
    }

    /// Returns the partition value.
    #[must_use]
    pub fn partition(&self) -> &KeyValue {
        &self.partition
    }

    /// Returns the sort value, if any.
    #[must_use]
    pub fn sort(&self) -> Option<&KeyValue> {
        self.sort.as_ref()
    }

    /// Converts the tuple into the key-attribute map used by delete requests.
    pub fn to_key_attributes(&self, schema: &KeySchema) -> AppResult<KeyAttributes> {
        self.partition.validate_as_key(schema.partition_key())?;

        let mut attributes =
            KeyAttributes::from([(schema.partition_key().to_owned(), self.partition.clone())]);

        match (schema.sort_key(), &self.sort) {
            (Some(name), Some(value)) => {
                value.validate_as_key(name)?;
                attributes.insert(name.to_owned(), value.clone());
            }
            (Some(name), None) => {
                return Err(AppError::Marshal(format!(
                    "record '{}' has no value for sort key '{name}'",
                    self.partition
                )));
            }
            (None, Some(_)) => {
                return Err(AppError::Marshal(format!(
                    "record '{}' carries a sort value but the table has no sort key",
                    self.partition
                )));
            }
            (None, None) => {}
        }

        Ok(attributes)
    }
}

/// Opaque continuation token of a paginated scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCursor(KeyAttributes);

impl ScanCursor {
    /// Wraps the provider's last evaluated key. Returns `None` for an empty key,
    /// which signals scan exhaustion.
    #[must_use]
    pub fn from_last_evaluated_key(attributes: KeyAttributes) -> Option<Self> {
        (!attributes.is_empty()).then_some(Self(attributes))
    }

    /// Returns the attributes to pass as the exclusive start key.
    #[must_use]
    pub fn attributes(&self) -> &KeyAttributes {
        &self.0
    }
}
