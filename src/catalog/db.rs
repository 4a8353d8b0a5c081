//! Database access seam for catalog introspection.
//!
//! The ingester only needs to run parameterless statements and read scalar
//! cells by position, so the driver behind this trait is the caller's
//! business. Rows model the declared SELECT types loosely: text, integer,
//! boolean, null.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DbError {
    #[error("query failed: {message}")]
    Query { message: String },
    #[error("query canceled by caller")]
    Canceled,
    #[error("column {index}: expected {expected}")]
    Column { index: usize, expected: &'static str },
}

pub type Result<T> = std::result::Result<T, DbError>;

/// One scalar cell of an introspection result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl From<serde_json::Value> for Value {
    /// Bridge for drivers that surface rows as JSON lines.
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .unwrap_or_else(|| Value::Text(n.to_string())),
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Text(other.to_string()),
        }
    }
}

/// A positional row. Missing optional fields arrive as `Null` and read back
/// as empty text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Builds a row from a JSON array, in element order.
    pub fn from_json_array(values: Vec<serde_json::Value>) -> Self {
        Self::new(values.into_iter().map(Value::from).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn cell(&self, index: usize, expected: &'static str) -> Result<&Value> {
        self.values
            .get(index)
            .ok_or(DbError::Column { index, expected })
    }

    /// Text cell. `Null` reads as the empty string, matching how absent
    /// foreign-key fields arrive from the dialect statements.
    pub fn text(&self, index: usize) -> Result<&str> {
        match self.cell(index, "text")? {
            Value::Text(s) => Ok(s),
            Value::Null => Ok(""),
            _ => Err(DbError::Column {
                index,
                expected: "text",
            }),
        }
    }

    /// Boolean cell. Integer cells are accepted as 0/1 since MySQL has no
    /// boolean result type.
    pub fn boolean(&self, index: usize) -> Result<bool> {
        match self.cell(index, "boolean")? {
            Value::Bool(b) => Ok(*b),
            Value::Int(n) => Ok(*n != 0),
            Value::Null => Ok(false),
            _ => Err(DbError::Column {
                index,
                expected: "boolean",
            }),
        }
    }

    pub fn int(&self, index: usize) -> Result<i64> {
        match self.cell(index, "integer")? {
            Value::Int(n) => Ok(*n),
            Value::Null => Ok(0),
            _ => Err(DbError::Column {
                index,
                expected: "integer",
            }),
        }
    }
}

/// Handle the ingester runs its three introspection statements against.
#[async_trait]
pub trait Db: Send + Sync {
    async fn query(&self, sql: &str) -> Result<Vec<Row>>;
    async fn query_row(&self, sql: &str) -> Result<Row>;
}
