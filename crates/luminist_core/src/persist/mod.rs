//! Persistence of the editor's working state.
//!
//! # Responsibility
//! - Declare the storage capability the editor writes through (`store`).
//! - Enforce single-flight flushes per project (`coordinator`).
//!
//! # Invariants
//! - A flush replaces locator + snapshot as a unit or leaves the stored
//!   document untouched.
//! - At most one flush per project is in flight.

pub mod coordinator;
pub mod store;
