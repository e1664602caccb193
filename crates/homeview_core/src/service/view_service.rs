//! View use-case service.
//!
//! # Responsibility
//! - Write documents through the repository and keep every registered
//!   view index current.
//! - Answer view queries, attaching source documents on request.
//!
//! # Invariants
//! - After any successful write, every index reflects the stored revision.
//! - `Unchanged` writes never touch indexes.
//! - The `simpleViews/quickview` view is always registered.

use crate::model::document::Document;
use crate::repo::document_repo::{DocumentListQuery, DocumentRepository, PutOutcome, RepoError};
use crate::view::index::ViewIndex;
use crate::view::projector::{FieldProjector, MapFunction, QUICKVIEW_NAME, SIMPLE_VIEWS_DESIGN};
use crate::view::query::{ViewQuery, ViewResult};
use log::{info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ViewServiceResult<T> = Result<T, ViewServiceError>;

#[derive(Debug)]
pub enum ViewServiceError {
    UnknownView(String),
    DuplicateView(String),
    Repo(RepoError),
}

impl Display for ViewServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownView(name) => write!(f, "unknown view `{name}`"),
            Self::DuplicateView(name) => write!(f, "view `{name}` is already registered"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ViewServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::UnknownView(_) | Self::DuplicateView(_) => None,
        }
    }
}

impl From<RepoError> for ViewServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Builds the `<design>/<view>` path views are registered under.
pub fn view_path(design: &str, view: &str) -> String {
    format!("{design}/{view}")
}

/// Registered path of the listing quick-look view.
pub fn quickview_path() -> String {
    view_path(SIMPLE_VIEWS_DESIGN, QUICKVIEW_NAME)
}

/// Use-case service owning view indexes over one document repository.
pub struct ViewService<R: DocumentRepository> {
    repo: R,
    views: BTreeMap<String, ViewIndex>,
}

impl<R: DocumentRepository> ViewService<R> {
    /// Creates the service and builds the quickview index from stored documents.
    pub fn new(repo: R) -> ViewServiceResult<Self> {
        let mut service = Self {
            repo,
            views: BTreeMap::new(),
        };
        service.register_view(quickview_path(), Box::new(FieldProjector::quickview()))?;
        Ok(service)
    }

    /// Registers a view under `path` and builds it from stored documents.
    ///
    /// # Errors
    /// - `DuplicateView` when `path` is already registered.
    pub fn register_view(
        &mut self,
        path: impl Into<String>,
        map_fn: Box<dyn MapFunction>,
    ) -> ViewServiceResult<()> {
        let path = path.into();
        if self.views.contains_key(&path) {
            return Err(ViewServiceError::DuplicateView(path));
        }

        let docs = self.live_documents()?;
        let mut index = ViewIndex::new(map_fn);
        index.rebuild(&docs);
        info!(
            "event=view_register module=service status=ok view={} rows={}",
            path,
            index.len()
        );
        self.views.insert(path, index);
        Ok(())
    }

    /// Registered view paths, sorted.
    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Stores a document and re-indexes it when the write took effect.
    pub fn put_document(&mut self, doc: &Document) -> ViewServiceResult<PutOutcome> {
        let outcome = self.repo.put_document(doc)?;
        if !outcome.is_written() {
            return Ok(outcome);
        }

        let mut stored = doc.clone();
        stored.set_rev(outcome.rev());
        for index in self.views.values_mut() {
            index.update(&stored);
        }
        Ok(outcome)
    }

    /// Tombstones a document and drops its rows from every view.
    pub fn delete_document(&mut self, id: &str) -> ViewServiceResult<String> {
        let rev = self.repo.delete_document(id)?;
        for index in self.views.values_mut() {
            index.remove(id);
        }
        Ok(rev)
    }

    /// Rebuilds every view from the repository. Returns the document count.
    pub fn rebuild_all(&mut self) -> ViewServiceResult<usize> {
        let docs = self.live_documents()?;
        for index in self.views.values_mut() {
            index.rebuild(&docs);
        }
        Ok(docs.len())
    }

    /// Reads a view by registered path.
    ///
    /// # Errors
    /// - `UnknownView` when `path` is not registered.
    /// - `Repo` when `include_docs` lookups fail.
    pub fn query(&self, path: &str, query: &ViewQuery) -> ViewServiceResult<ViewResult> {
        let index = self
            .views
            .get(path)
            .ok_or_else(|| ViewServiceError::UnknownView(path.to_string()))?;

        let mut result = index.query(query);
        if query.include_docs {
            for row in &mut result.rows {
                row.doc = self
                    .repo
                    .get_document(&row.id, false)?
                    .map(Document::into_value);
                if row.doc.is_none() {
                    warn!(
                        "event=view_query module=service status=degraded view={path} reason=doc_missing"
                    );
                }
            }
        }
        Ok(result)
    }

    fn live_documents(&self) -> ViewServiceResult<Vec<Document>> {
        Ok(self.repo.list_documents(&DocumentListQuery::default())?)
    }
}
