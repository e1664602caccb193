//! Document repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Store listing documents as JSON bodies keyed by `_id`.
//! - Assign revisions and skip writes that change nothing.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `Document::validate()` before SQL mutations.
//! - Stored bodies never contain `_id` or `_rev`; reads stamp both back.
//! - `generation` grows by one on every effective write, delete included.
//! - Read paths reject corrupt persisted state instead of masking it.

use crate::db::DbError;
use crate::model::document::{DocId, Document, DocumentError, ID_FIELD, REV_FIELD};
use log::info;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const DOCUMENT_SELECT_SQL: &str = "SELECT
    doc_id,
    generation,
    rev,
    body,
    is_deleted
FROM documents";

/// Fields that never count as a change when comparing revisions.
///
/// `scrape_data` carries the scrape timestamp, which differs on every run.
pub const VOLATILE_FIELDS: &[&str] = &[ID_FIELD, REV_FIELD, "scrape_data"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for document persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Document(DocumentError),
    Db(DbError),
    NotFound(DocId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Document(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "document not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted document data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Document(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DocumentError> for RepoError {
    fn from(value: DocumentError) -> Self {
        Self::Document(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// What a `put_document` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    Created { rev: String },
    Updated { rev: String },
    /// Body matched the stored revision; nothing was written.
    Unchanged { rev: String },
}

impl PutOutcome {
    /// Revision the document is at after the call.
    pub fn rev(&self) -> &str {
        match self {
            Self::Created { rev } | Self::Updated { rev } | Self::Unchanged { rev } => rev,
        }
    }

    pub fn is_written(&self) -> bool {
        !matches!(self, Self::Unchanged { .. })
    }
}

/// Query options for listing documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentListQuery {
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for document storage.
pub trait DocumentRepository {
    /// Creates or updates a document. Last write wins; incoming `_rev` is ignored.
    fn put_document(&self, doc: &Document) -> RepoResult<PutOutcome>;
    fn get_document(&self, id: &str, include_deleted: bool) -> RepoResult<Option<Document>>;
    /// Returns whether a live (non-deleted) document exists.
    fn contains_document(&self, id: &str) -> RepoResult<bool>;
    /// Lists documents ordered by id ascending.
    fn list_documents(&self, query: &DocumentListQuery) -> RepoResult<Vec<Document>>;
    /// Tombstones a live document and returns the tombstone revision.
    fn delete_document(&self, id: &str) -> RepoResult<String>;
}

impl<R: DocumentRepository + ?Sized> DocumentRepository for &R {
    fn put_document(&self, doc: &Document) -> RepoResult<PutOutcome> {
        (**self).put_document(doc)
    }

    fn get_document(&self, id: &str, include_deleted: bool) -> RepoResult<Option<Document>> {
        (**self).get_document(id, include_deleted)
    }

    fn contains_document(&self, id: &str) -> RepoResult<bool> {
        (**self).contains_document(id)
    }

    fn list_documents(&self, query: &DocumentListQuery) -> RepoResult<Vec<Document>> {
        (**self).list_documents(query)
    }

    fn delete_document(&self, id: &str) -> RepoResult<String> {
        (**self).delete_document(id)
    }
}

/// SQLite-backed document repository.
pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn load_row(&self, id: &str) -> RepoResult<Option<StoredDocument>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DOCUMENT_SELECT_SQL} WHERE doc_id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_document_row(row)?)),
            None => Ok(None),
        }
    }
}

struct StoredDocument {
    doc_id: DocId,
    generation: i64,
    rev: String,
    body: Map<String, Value>,
    is_deleted: bool,
}

impl StoredDocument {
    fn into_document(self) -> Document {
        let mut doc = Document::from_map(self.body);
        doc.set_field(ID_FIELD, self.doc_id);
        doc.set_rev(self.rev);
        doc
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn put_document(&self, doc: &Document) -> RepoResult<PutOutcome> {
        let id = doc.validate()?;
        let body = storable_body(doc);
        let body_text = serde_json::to_string(&body)
            .map_err(|err| RepoError::InvalidData(format!("unserializable body: {err}")))?;

        let tx = self.conn.unchecked_transaction()?;
        let outcome = match self.load_row(id)? {
            None => {
                let rev = next_rev(1);
                tx.execute(
                    "INSERT INTO documents (doc_id, generation, rev, body, is_deleted)
                     VALUES (?1, 1, ?2, ?3, 0);",
                    params![id, rev, body_text],
                )?;
                PutOutcome::Created { rev }
            }
            Some(stored) if !stored.is_deleted && same_content(&stored.body, &body) => {
                PutOutcome::Unchanged { rev: stored.rev }
            }
            Some(stored) => {
                let generation = stored.generation + 1;
                let rev = next_rev(generation);
                tx.execute(
                    "UPDATE documents
                     SET
                        generation = ?1,
                        rev = ?2,
                        body = ?3,
                        is_deleted = 0,
                        updated_at = (strftime('%s', 'now') * 1000)
                     WHERE doc_id = ?4;",
                    params![generation, rev, body_text, id],
                )?;
                PutOutcome::Updated { rev }
            }
        };
        tx.commit()?;

        if outcome.is_written() {
            info!(
                "event=doc_put module=repo status=ok rev={}",
                outcome.rev()
            );
        }
        Ok(outcome)
    }

    fn get_document(&self, id: &str, include_deleted: bool) -> RepoResult<Option<Document>> {
        Ok(self
            .load_row(id)?
            .filter(|stored| include_deleted || !stored.is_deleted)
            .map(StoredDocument::into_document))
    }

    fn contains_document(&self, id: &str) -> RepoResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM documents WHERE doc_id = ?1 AND is_deleted = 0;",
                [id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn list_documents(&self, query: &DocumentListQuery) -> RepoResult<Vec<Document>> {
        let mut sql = format!("{DOCUMENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<SqlValue> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }

        sql.push_str(" ORDER BY doc_id ASC");

        match query.limit {
            Some(limit) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                bind_values.push(SqlValue::Integer(i64::from(limit)));
            }
            None => sql.push_str(" LIMIT -1 OFFSET ?"),
        }
        bind_values.push(SqlValue::Integer(i64::from(query.offset)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut docs = Vec::new();

        while let Some(row) = rows.next()? {
            docs.push(parse_document_row(row)?.into_document());
        }

        Ok(docs)
    }

    fn delete_document(&self, id: &str) -> RepoResult<String> {
        let stored = self
            .load_row(id)?
            .filter(|stored| !stored.is_deleted)
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;

        let generation = stored.generation + 1;
        let rev = next_rev(generation);
        self.conn.execute(
            "UPDATE documents
             SET
                generation = ?1,
                rev = ?2,
                is_deleted = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE doc_id = ?3;",
            params![generation, rev, id],
        )?;

        info!("event=doc_delete module=repo status=ok rev={rev}");
        Ok(rev)
    }
}

fn parse_document_row(row: &Row<'_>) -> RepoResult<StoredDocument> {
    let doc_id: String = row.get("doc_id")?;

    let generation: i64 = row.get("generation")?;
    if generation < 1 {
        return Err(RepoError::InvalidData(format!(
            "invalid generation `{generation}` in documents.generation"
        )));
    }

    let body_text: String = row.get("body")?;
    let body = match serde_json::from_str::<Value>(&body_text) {
        Ok(Value::Object(body)) => body,
        Ok(_) => {
            return Err(RepoError::InvalidData(format!(
                "non-object body for `{doc_id}` in documents.body"
            )));
        }
        Err(err) => {
            return Err(RepoError::InvalidData(format!(
                "malformed body for `{doc_id}` in documents.body: {err}"
            )));
        }
    };

    let is_deleted = match row.get::<_, i64>("is_deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_deleted value `{other}` in documents.is_deleted"
            )));
        }
    };

    Ok(StoredDocument {
        doc_id,
        generation,
        rev: row.get("rev")?,
        body,
        is_deleted,
    })
}

fn storable_body(doc: &Document) -> Map<String, Value> {
    let mut body = doc.fields().clone();
    body.remove(ID_FIELD);
    body.remove(REV_FIELD);
    body
}

fn same_content(stored: &Map<String, Value>, incoming: &Map<String, Value>) -> bool {
    let significant = |body: &Map<String, Value>| {
        body.iter()
            .filter(|(name, _)| !VOLATILE_FIELDS.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect::<Map<String, Value>>()
    };
    significant(stored) == significant(incoming)
}

fn next_rev(generation: i64) -> String {
    format!("{generation}-{}", Uuid::new_v4().simple())
}
