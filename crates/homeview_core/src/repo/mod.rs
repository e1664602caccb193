//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the document-source contract the view layer reads from.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes enforce `Document::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod document_repo;
