//! Domain model for the editor core.
//!
//! # Responsibility
//! - Define the directive, scene and project shapes shared by every layer.
//! - Keep identity (`NodeId`, `ProjectId`) explicit in signatures.
//!
//! # Invariants
//! - Directive families are derived from the variant tag, never re-parsed
//!   from raw strings at merge time.
//! - The scene graph's active reference is a lookup key, never an owner.

pub mod directive;
pub mod project;
pub mod scene;
