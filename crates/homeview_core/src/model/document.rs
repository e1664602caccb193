//! Opaque document record.
//!
//! # Responsibility
//! - Hold one listing document exactly as its producer wrote it.
//! - Expose field lookup without imposing a schema.
//! - Validate identifiers on write paths only.
//!
//! # Invariants
//! - The wrapped value is always a JSON object.
//! - `_id` is the identity field; `_rev` is owned by the repository.
//! - Ids starting with `_` are reserved, except design documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub const ID_FIELD: &str = "_id";
pub const REV_FIELD: &str = "_rev";
pub const DESIGN_DOC_PREFIX: &str = "_design/";

/// Document identifier as stored in `_id`.
pub type DocId = String;

/// Error raised when a JSON value cannot act as an addressable document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// Input JSON was not an object; carries the JSON kind that was found.
    NotAnObject(&'static str),
    /// `_id` is absent or not a string.
    MissingId,
    /// `_id` is present but not acceptable as a document identifier.
    InvalidId(String),
}

impl Display for DocumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject(kind) => write!(f, "document must be a JSON object, got {kind}"),
            Self::MissingId => write!(f, "document has no string `_id`"),
            Self::InvalidId(id) => write!(f, "invalid document id `{id}`"),
        }
    }
}

impl Error for DocumentError {}

/// A single externally owned record with named fields.
///
/// Serialized transparently as the underlying JSON object, so a document
/// written out is byte-for-byte the shape its producer handed in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: Map<String, Value>,
}

impl Document {
    /// Creates an empty document with the given id.
    pub fn new(id: impl Into<DocId>) -> Self {
        let mut fields = Map::new();
        fields.insert(ID_FIELD.to_string(), Value::String(id.into()));
        Self { fields }
    }

    /// Creates an empty document with a generated id.
    ///
    /// Generated ids are 32 lowercase hex chars, the format the hosted
    /// database hands out for server-assigned ids.
    pub fn with_generated_id() -> Self {
        Self::new(Uuid::new_v4().simple().to_string())
    }

    /// Wraps a JSON value, rejecting anything that is not an object.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(DocumentError::NotAnObject(json_kind(&other))),
        }
    }

    /// Wraps an already-parsed JSON object.
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_field(name, value);
        self
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Returns a field value; `None` when the field is absent.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns the raw `_id` value, whatever its JSON type.
    pub fn raw_id(&self) -> Option<&Value> {
        self.fields.get(ID_FIELD)
    }

    /// Returns `_id` when it is a string.
    pub fn id(&self) -> Option<&str> {
        self.raw_id().and_then(Value::as_str)
    }

    /// Returns `_rev` when it is a string.
    pub fn rev(&self) -> Option<&str> {
        self.fields.get(REV_FIELD).and_then(Value::as_str)
    }

    pub fn set_rev(&mut self, rev: impl Into<String>) {
        self.fields
            .insert(REV_FIELD.to_string(), Value::String(rev.into()));
    }

    pub fn is_design_doc(&self) -> bool {
        self.id().is_some_and(|id| id.starts_with(DESIGN_DOC_PREFIX))
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// Validates that the document is addressable by the repository.
    ///
    /// # Errors
    /// - `MissingId` when `_id` is absent or not a string.
    /// - `InvalidId` when `_id` is blank or uses a reserved `_` prefix.
    pub fn validate(&self) -> Result<&str, DocumentError> {
        let id = self.id().ok_or(DocumentError::MissingId)?;
        validate_doc_id(id)?;
        Ok(id)
    }
}

impl TryFrom<Value> for Document {
    type Error = DocumentError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        value.into_value()
    }
}

/// Checks identifier rules shared by every write path.
pub fn validate_doc_id(id: &str) -> Result<(), DocumentError> {
    if id.trim().is_empty() {
        return Err(DocumentError::InvalidId(id.to_string()));
    }
    if id.starts_with('_') {
        let design_name = id.strip_prefix(DESIGN_DOC_PREFIX);
        if !matches!(design_name, Some(name) if !name.is_empty()) {
            return Err(DocumentError::InvalidId(id.to_string()));
        }
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
