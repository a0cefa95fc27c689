//! Transformation directive model.
//!
//! # Responsibility
//! - Classify raw directive strings from a `tr:` segment into typed variants.
//! - Render typed directives back to their exact wire form.
//!
//! # Invariants
//! - `Directive::classify(raw).raw() == raw` for every input string.
//! - Family follows the marker: every `fl-` string is a flip and every
//!   `e-edit` string is a prompt edit, canonical or not.
//! - Unknown directives survive as `Opaque` and are never dropped.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Wire marker for the flip family (`fl-h`, `fl-v`, `fl-h_v`).
pub const FLIP_MARKER: &str = "fl-";
/// Prefix shared by every prompt-edit wire form.
pub const PROMPT_EDIT_FAMILY_PREFIX: &str = "e-edit";
/// Wire marker for a plain prompt edit (`e-edit-prompt-add_flowers`).
pub const PROMPT_EDIT_MARKER: &str = "e-edit-prompt-";
/// Wire marker for a base64 prompt edit; the trailing `e` flags encoding.
pub const PROMPT_EDIT_ENCODED_MARKER: &str = "e-edit-prompte-";
/// Separator between directives inside one `tr:` segment.
pub const DIRECTIVE_DELIMITER: char = ',';

/// Mirror axis for the flip family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlipDirection {
    /// Mirror left to right.
    Horizontal,
    /// Mirror top to bottom.
    Vertical,
    /// Mirror on both axes.
    Both,
}

impl FlipDirection {
    /// Short code used after the flip marker.
    pub fn code(self) -> &'static str {
        match self {
            Self::Horizontal => "h",
            Self::Vertical => "v",
            Self::Both => "h_v",
        }
    }

    /// Parses a flip code. Only the canonical spellings are accepted so the
    /// wire form round-trips byte for byte.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "h" => Some(Self::Horizontal),
            "v" => Some(Self::Vertical),
            "h_v" => Some(Self::Both),
            _ => None,
        }
    }

    /// Human-readable adverb for status messages.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Horizontal => "horizontally",
            Self::Vertical => "vertically",
            Self::Both => "in both directions",
        }
    }
}

/// Operation group of a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveFamily {
    Flip,
    PromptEdit,
    Opaque,
}

impl DirectiveFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flip => "flip",
            Self::PromptEdit => "edit-prompt",
            Self::Opaque => "opaque",
        }
    }
}

/// One transformation instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Directive {
    Flip(FlipDirection),
    /// `payload` is the wire token after the marker: whitespace-joined text
    /// when `encoded == false`, percent-escaped base64 otherwise.
    PromptEdit { payload: String, encoded: bool },
    /// Carries a family marker but no canonical value (`fl-v_h`,
    /// `e-edit-prompt-`); kept verbatim.
    Irregular { family: DirectiveFamily, raw: String },
    /// Directive this crate does not model; kept verbatim.
    Opaque(String),
}

impl Directive {
    /// Classifies one raw directive string by its family marker.
    pub fn classify(raw: &str) -> Self {
        if let Some(code) = raw.strip_prefix(FLIP_MARKER) {
            return match FlipDirection::from_code(code) {
                Some(direction) => Self::Flip(direction),
                None => Self::irregular(DirectiveFamily::Flip, raw),
            };
        }

        if let Some(payload) = raw
            .strip_prefix(PROMPT_EDIT_ENCODED_MARKER)
            .filter(|payload| !payload.is_empty())
        {
            return Self::PromptEdit {
                payload: payload.to_string(),
                encoded: true,
            };
        }

        if let Some(payload) = raw
            .strip_prefix(PROMPT_EDIT_MARKER)
            .filter(|payload| !payload.is_empty())
        {
            return Self::PromptEdit {
                payload: payload.to_string(),
                encoded: false,
            };
        }

        if raw.starts_with(PROMPT_EDIT_FAMILY_PREFIX) {
            return Self::irregular(DirectiveFamily::PromptEdit, raw);
        }

        Self::Opaque(raw.to_string())
    }

    fn irregular(family: DirectiveFamily, raw: &str) -> Self {
        Self::Irregular {
            family,
            raw: raw.to_string(),
        }
    }

    pub fn family(&self) -> DirectiveFamily {
        match self {
            Self::Flip(_) => DirectiveFamily::Flip,
            Self::PromptEdit { .. } => DirectiveFamily::PromptEdit,
            Self::Irregular { family, .. } => *family,
            Self::Opaque(_) => DirectiveFamily::Opaque,
        }
    }

    /// Returns whether `self` and `other` compete for the same family slot.
    ///
    /// Opaque directives only collide with an identical opaque directive.
    pub fn same_family(&self, other: &Directive) -> bool {
        match (self, other) {
            (Self::Opaque(left), Self::Opaque(right)) => left == right,
            _ => self.family() == other.family(),
        }
    }

    /// Exact wire form of this directive.
    pub fn raw(&self) -> String {
        self.to_string()
    }
}

impl Display for Directive {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flip(direction) => write!(f, "{FLIP_MARKER}{}", direction.code()),
            Self::PromptEdit {
                payload,
                encoded: true,
            } => write!(f, "{PROMPT_EDIT_ENCODED_MARKER}{payload}"),
            Self::PromptEdit {
                payload,
                encoded: false,
            } => write!(f, "{PROMPT_EDIT_MARKER}{payload}"),
            Self::Irregular { raw, .. } | Self::Opaque(raw) => f.write_str(raw),
        }
    }
}

/// Ordered directive list carried by one resource locator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectivePipeline {
    directives: Vec<Directive>,
}

impl DirectivePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps directives as-is; no family deduplication is applied.
    pub fn from_directives(directives: Vec<Directive>) -> Self {
        Self { directives }
    }

    /// Splits a `tr:` segment body into classified directives.
    ///
    /// Empty entries (`a,,b`) are skipped.
    pub fn from_segment_body(body: &str) -> Self {
        body.split(DIRECTIVE_DELIMITER)
            .filter(|raw| !raw.is_empty())
            .map(Directive::classify)
            .collect()
    }

    /// Joins raw directive strings with the list delimiter.
    pub fn to_segment_body(&self) -> String {
        self.directives
            .iter()
            .map(Directive::raw)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Directive> {
        self.directives.iter()
    }

    pub fn as_slice(&self) -> &[Directive] {
        &self.directives
    }

    /// Returns the first directive of `family`, if any.
    pub fn find_family(&self, family: DirectiveFamily) -> Option<&Directive> {
        self.directives
            .iter()
            .find(|directive| directive.family() == family)
    }

    pub fn into_directives(self) -> Vec<Directive> {
        self.directives
    }
}

impl FromIterator<Directive> for DirectivePipeline {
    fn from_iter<T: IntoIterator<Item = Directive>>(iter: T) -> Self {
        Self {
            directives: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DirectivePipeline {
    type Item = &'a Directive;
    type IntoIter = std::slice::Iter<'a, Directive>;

    fn into_iter(self) -> Self::IntoIter {
        self.directives.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{Directive, DirectiveFamily, DirectivePipeline, FlipDirection};

    #[test]
    fn classifies_known_families() {
        assert_eq!(
            Directive::classify("fl-h_v"),
            Directive::Flip(FlipDirection::Both)
        );
        assert_eq!(
            Directive::classify("e-edit-prompt-add_flowers"),
            Directive::PromptEdit {
                payload: "add_flowers".to_string(),
                encoded: false,
            }
        );
        assert_eq!(
            Directive::classify("e-edit-prompte-YQ%3D%3D").family(),
            DirectiveFamily::PromptEdit
        );
    }

    #[test]
    fn unknown_strings_stay_opaque() {
        for raw in ["w-300", "e-bgremove", "flip-h"] {
            let directive = Directive::classify(raw);
            assert_eq!(directive, Directive::Opaque(raw.to_string()));
            assert_eq!(directive.raw(), raw);
        }
    }

    #[test]
    fn non_canonical_strings_keep_marker_family_and_bytes() {
        for (raw, family) in [
            ("fl-v_h", DirectiveFamily::Flip),
            ("fl-x", DirectiveFamily::Flip),
            ("fl-", DirectiveFamily::Flip),
            ("e-edit-prompt-", DirectiveFamily::PromptEdit),
            ("e-edit-prompte-", DirectiveFamily::PromptEdit),
            ("e-edit-other-sky", DirectiveFamily::PromptEdit),
        ] {
            let directive = Directive::classify(raw);
            assert!(matches!(directive, Directive::Irregular { .. }), "`{raw}`");
            assert_eq!(directive.family(), family, "`{raw}`");
            assert_eq!(directive.raw(), raw);
        }
        assert!(Directive::classify("fl-v_h")
            .same_family(&Directive::Flip(FlipDirection::Horizontal)));
    }

    #[test]
    fn opaque_directives_only_share_family_with_identical_raw() {
        let width = Directive::classify("w-300");
        assert!(width.same_family(&Directive::classify("w-300")));
        assert!(!width.same_family(&Directive::classify("h-200")));
        assert!(Directive::Flip(FlipDirection::Horizontal)
            .same_family(&Directive::Flip(FlipDirection::Vertical)));
    }

    #[test]
    fn segment_body_skips_empty_entries() {
        let pipeline = DirectivePipeline::from_segment_body("fl-h,,w-300,");
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.to_segment_body(), "fl-h,w-300");
    }
}
