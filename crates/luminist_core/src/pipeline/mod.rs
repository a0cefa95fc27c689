//! Transformation pipeline plumbing for resource locators.
//!
//! # Responsibility
//! - Parse and serialize the `tr:` directive segment of a locator (`codec`).
//! - Encode free-form prompt text into URL-safe directives (`encoder`).
//! - Fold a new directive into an existing pipeline (`merge`).
//!
//! # Invariants
//! - None of these operations perform I/O.
//! - Well-formed locators never produce errors.

pub mod codec;
pub mod encoder;
pub mod merge;

use crate::model::directive::Directive;
use codec::LocatorError;

/// Parses `locator`, merges `directive` into its pipeline and serializes the
/// result.
pub fn apply_directive(locator: &str, directive: Directive) -> Result<String, LocatorError> {
    let parsed = codec::parse(locator)?;
    let pipeline = merge::merge(&parsed.pipeline, directive);
    codec::serialize(&parsed.base, &pipeline)
}
