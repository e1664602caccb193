//! Map/reduce-style secondary views over listing documents.
//!
//! # Responsibility
//! - Define map functions that turn one document into emissions.
//! - Collect emissions into key-sorted indexes and answer range queries.
//!
//! # Invariants
//! - Map functions are pure and invoked once per document revision.
//! - Index rows are ordered by key collation, then by document id.
//! - Design documents are never fed to map functions.

pub mod collate;
pub mod index;
pub mod projector;
pub mod query;
