//! Core use-case services.
//!
//! # Responsibility
//! - Gate project creation (`admission`, `project_service`).
//! - Run editing tools end to end (`edit_service`).
//! - Keep UI and CLI callers decoupled from storage and network details.

pub mod admission;
pub mod edit_service;
pub mod project_service;
