//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository writes and view index maintenance.
//! - Keep CLI callers decoupled from storage details.

pub mod view_service;
