//! Field projectors: map functions that copy selected fields into a row.
//!
//! # Responsibility
//! - Define the `MapFunction` contract the index invokes per document.
//! - Provide the `quickview` projection used by listing dashboards.
//!
//! # Invariants
//! - Projection is total: every document yields exactly one emission.
//! - The emitted value has one slot per configured field, in order.
//! - Absent fields project as `null`; values are copied, never transformed.

use crate::model::document::{Document, ID_FIELD};
use serde::Serialize;
use serde_json::Value;

/// Design document that owns the listing views.
pub const SIMPLE_VIEWS_DESIGN: &str = "simpleViews";

/// Name of the quick-look listing view inside [`SIMPLE_VIEWS_DESIGN`].
pub const QUICKVIEW_NAME: &str = "quickview";

/// Value slots emitted by the quickview projection, in emission order.
pub const QUICKVIEW_FIELDS: [&str; 13] = [
    "status",
    "added_date",
    "full_address",
    "work_commute",
    "first_walk_mins",
    "first_leg_type",
    "beds",
    "baths",
    "list_price",
    "condocoop_fee",
    "Windmill_Hill_Park_time",
    "tether",
    "nearby_metro",
];

/// One `(key, value)` pair handed from a map function to the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Emission {
    pub key: Value,
    pub value: Value,
}

/// A view map function.
///
/// Implementations must be pure: the index may call `map` any number of
/// times for the same document revision, from any thread.
pub trait MapFunction: Send + Sync {
    /// View name used in logs and result metadata.
    fn name(&self) -> &str;

    /// Maps one document to zero or more emissions.
    fn map(&self, doc: &Document) -> Vec<Emission>;
}

/// Projects a key field plus an ordered list of value fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProjector {
    name: String,
    key_field: String,
    value_fields: Vec<String>,
}

impl FieldProjector {
    pub fn new<I, S>(name: impl Into<String>, key_field: impl Into<String>, value_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            key_field: key_field.into(),
            value_fields: value_fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Listing quick-look: keyed by `_id`, thirteen summary fields.
    pub fn quickview() -> Self {
        Self::new(QUICKVIEW_NAME, ID_FIELD, QUICKVIEW_FIELDS)
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn value_fields(&self) -> &[String] {
        &self.value_fields
    }

    /// Builds the single emission for `doc`.
    pub fn project(&self, doc: &Document) -> Emission {
        let key = copy_field(doc, &self.key_field);
        let value = self
            .value_fields
            .iter()
            .map(|field| copy_field(doc, field))
            .collect();

        Emission {
            key,
            value: Value::Array(value),
        }
    }
}

impl MapFunction for FieldProjector {
    fn name(&self) -> &str {
        &self.name
    }

    fn map(&self, doc: &Document) -> Vec<Emission> {
        vec![self.project(doc)]
    }
}

fn copy_field(doc: &Document, name: &str) -> Value {
    doc.field(name).cloned().unwrap_or(Value::Null)
}
