//! Core of the listing views store.
//! Documents in, sorted `(key, value)` view rows out.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod view;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::document::{DocId, Document, DocumentError};
pub use repo::document_repo::{
    DocumentListQuery, DocumentRepository, PutOutcome, RepoError, RepoResult,
    SqliteDocumentRepository,
};
pub use service::view_service::{
    quickview_path, view_path, ViewService, ViewServiceError, ViewServiceResult,
};
pub use view::index::ViewIndex;
pub use view::projector::{Emission, FieldProjector, MapFunction, QUICKVIEW_FIELDS};
pub use view::query::{ViewQuery, ViewResult, ViewRow};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
