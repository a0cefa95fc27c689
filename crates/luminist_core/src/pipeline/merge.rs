//! Pipeline merge policy.
//!
//! # Invariants
//! - After `merge`, at most one directive of the new directive's family
//!   remains, and it is the new one.
//! - Directives of other families keep their relative order.
//! - `merge(merge(p, d), d) == merge(p, d)`.

use crate::model::directive::{Directive, DirectivePipeline};

/// Folds `directive` into `pipeline`; the latest directive of a family wins.
///
/// Merging a directive that is already the only member of its family
/// returns the pipeline unchanged, keeping its position.
pub fn merge(pipeline: &DirectivePipeline, directive: Directive) -> DirectivePipeline {
    let already_applied = {
        let mut same_family = pipeline
            .iter()
            .filter(|existing| existing.same_family(&directive));
        matches!(
            (same_family.next(), same_family.next()),
            (Some(only), None) if *only == directive
        )
    };
    if already_applied {
        return pipeline.clone();
    }

    let mut kept: Vec<Directive> = pipeline
        .iter()
        .filter(|existing| !existing.same_family(&directive))
        .cloned()
        .collect();
    kept.push(directive);
    DirectivePipeline::from_directives(kept)
}

impl DirectivePipeline {
    /// Method form of [`merge`].
    pub fn merged(&self, directive: Directive) -> DirectivePipeline {
        merge(self, directive)
    }
}
