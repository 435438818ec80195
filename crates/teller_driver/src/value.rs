//! Parameter and row value model.

use crate::error::{codes, DriverError, DriverResult};
use std::fmt;

/// A statement parameter or column value.
///
/// The driver layer only understands the column types the `member` schema
/// needs: text and 64-bit integers. `Null` exists so absent columns can
/// round-trip through rows without inventing sentinels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// UTF-8 text.
    Text(String),
    /// 64-bit signed integer.
    Int(i64),
    /// SQL NULL.
    Null,
}

impl Value {
    /// Returns the text content if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer content if this is an integer value.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Name of this value's type, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Int(_) => "integer",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "'{s}'"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Null => write!(f, "NULL"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

/// A single result row: ordered (column, value) pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Creates a row from ordered (column, value) pairs.
    #[must_use]
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    /// Returns the value of `column`, if present.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Returns the text content of `column`.
    ///
    /// # Errors
    ///
    /// Fails with the backend's column-not-found code when the column is
    /// missing or holds a non-text value.
    pub fn text(&self, column: &str) -> DriverResult<&str> {
        self.get(column)
            .and_then(Value::as_text)
            .ok_or_else(|| column_error(column))
    }

    /// Returns the integer content of `column`.
    ///
    /// # Errors
    ///
    /// Fails with the backend's column-not-found code when the column is
    /// missing or holds a non-integer value.
    pub fn int(&self, column: &str) -> DriverResult<i64> {
        self.get(column)
            .and_then(Value::as_int)
            .ok_or_else(|| column_error(column))
    }

    /// Number of columns in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

fn column_error(column: &str) -> DriverError {
    DriverError::new(
        codes::COLUMN_NOT_FOUND_1,
        format!("column not found or wrong type: {column}"),
    )
}
