//! Scene reconciliation against the canvas runtime.
//!
//! # Responsibility
//! - Declare the canvas and image-loading capabilities the core consumes.
//! - Swap scene nodes for freshly transformed images (`reconciler`).
//!
//! # Invariants
//! - The reconciler is the only writer of node geometry.
//! - A failed load never mutates the scene graph.

pub mod canvas;
pub mod loader;
pub mod reconciler;
