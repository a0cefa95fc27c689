//! Repository layer for project documents.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Keep SQL details out of the service and persistence layers.
//!
//! # Invariants
//! - Writes validate their input before touching SQL.
//! - Missing rows surface as `RepoError::NotFound`, not as silent no-ops.

pub mod project_repo;
