//! View query options and result shapes.
//!
//! Results serialize the way the hosted database answers view requests:
//! `{"total_rows": n, "offset": n, "rows": [{"id", "key", "value"}]}`.

use serde::Serialize;
use serde_json::Value;

/// Query options for reading a view.
#[derive(Debug, Clone)]
pub struct ViewQuery {
    /// Exact key match.
    pub key: Option<Value>,
    /// Multi-key lookup; results follow the order of `keys`.
    pub keys: Option<Vec<Value>>,
    /// First key in iteration direction.
    pub start_key: Option<Value>,
    /// Last key in iteration direction.
    pub end_key: Option<Value>,
    /// Whether rows equal to `end_key` are included.
    pub inclusive_end: bool,
    pub descending: bool,
    pub skip: usize,
    pub limit: Option<usize>,
    /// Attach the source document to each row. Resolved by the view service.
    pub include_docs: bool,
}

impl Default for ViewQuery {
    fn default() -> Self {
        Self {
            key: None,
            keys: None,
            start_key: None,
            end_key: None,
            inclusive_end: true,
            descending: false,
            skip: 0,
            limit: None,
            include_docs: false,
        }
    }
}

impl ViewQuery {
    /// Query matching a single key.
    pub fn by_key(key: impl Into<Value>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    /// Query matching an inclusive key range.
    pub fn range(start_key: impl Into<Value>, end_key: impl Into<Value>) -> Self {
        Self {
            start_key: Some(start_key.into()),
            end_key: Some(end_key.into()),
            ..Self::default()
        }
    }
}

/// One row of a view result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewRow {
    /// Id of the document that emitted this row.
    pub id: String,
    pub key: Value,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
}

/// Result of a view query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewResult {
    /// Total number of rows in the view, regardless of filters.
    pub total_rows: usize,
    /// Position of the first returned row in the directional ordering.
    pub offset: usize,
    pub rows: Vec<ViewRow>,
}

impl ViewResult {
    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(|row| &row.key)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.id.as_str())
    }
}
