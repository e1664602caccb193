//! Document model shared by the projector, index and repository layers.
//!
//! # Responsibility
//! - Wrap externally owned JSON records behind one opaque type.
//! - Keep identifier rules in one place.
//!
//! # Invariants
//! - A `Document` is always a JSON object.
//! - Map functions only ever borrow documents; they never mutate them.

pub mod document;
