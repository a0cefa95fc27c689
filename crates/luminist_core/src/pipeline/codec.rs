//! Directive segment codec.
//!
//! Locator layout: `https://<host>/<namespace>/tr:<d1>,<d2>/<path...>`.
//!
//! # Invariants
//! - The directive segment always sits right after the namespace segment.
//! - `serialize(parse(x)) == x` for locators produced by this crate.
//! - Query and fragment are carried through untouched.

use crate::model::directive::DirectivePipeline;
use std::error::Error;
use std::fmt::{Display, Formatter};
use url::Url;

/// Prefix that marks the directive segment.
pub const DIRECTIVE_SEGMENT_MARKER: &str = "tr:";

/// Locator with the directive segment removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePath {
    url: Url,
    segments: Vec<String>,
}

impl BasePath {
    /// `scheme://host[:port]` of the locator.
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// Non-empty path segments, still percent-encoded.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Account identifier of the transformation service.
    pub fn namespace(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    pub fn as_url(&self) -> &Url {
        &self.url
    }
}

/// Result of `parse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLocator {
    pub base: BasePath,
    pub pipeline: DirectivePipeline,
}

/// Locator parse/serialize failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorError {
    InvalidUrl(url::ParseError),
    /// URL has no hierarchical path (`mailto:`, `data:`).
    NotHierarchical,
    /// Directive segment without a namespace segment in front of it.
    MissingNamespace,
    /// Directive segment without any resource path segment after it.
    MissingResourcePath,
}

impl Display for LocatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUrl(err) => write!(f, "invalid locator url: {err}"),
            Self::NotHierarchical => write!(f, "locator has no hierarchical path"),
            Self::MissingNamespace => {
                write!(f, "locator has no namespace segment before the directives")
            }
            Self::MissingResourcePath => {
                write!(f, "locator has no resource path after the directive segment")
            }
        }
    }
}

impl Error for LocatorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidUrl(err) => Some(err),
            _ => None,
        }
    }
}

/// Splits a locator into its base path and directive pipeline.
///
/// Only the first `tr:` segment is treated as the directive segment.
pub fn parse(locator: &str) -> Result<ParsedLocator, LocatorError> {
    let url = Url::parse(locator).map_err(LocatorError::InvalidUrl)?;
    let mut segments: Vec<String> = url
        .path_segments()
        .ok_or(LocatorError::NotHierarchical)?
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();

    let pipeline = match segments
        .iter()
        .position(|segment| segment.starts_with(DIRECTIVE_SEGMENT_MARKER))
    {
        Some(0) => return Err(LocatorError::MissingNamespace),
        Some(index) if index + 1 >= segments.len() => {
            return Err(LocatorError::MissingResourcePath);
        }
        Some(index) => {
            let segment = segments.remove(index);
            DirectivePipeline::from_segment_body(&segment[DIRECTIVE_SEGMENT_MARKER.len()..])
        }
        None => DirectivePipeline::new(),
    };

    let mut base_url = url;
    base_url.set_path(&join_segments(&segments));

    Ok(ParsedLocator {
        base: BasePath {
            url: base_url,
            segments,
        },
        pipeline,
    })
}

/// Rebuilds a locator from a base path and pipeline.
///
/// An empty pipeline yields the base path without a directive segment.
pub fn serialize(base: &BasePath, pipeline: &DirectivePipeline) -> Result<String, LocatorError> {
    if pipeline.is_empty() {
        return Ok(base.url.to_string());
    }
    match base.segments.len() {
        0 => return Err(LocatorError::MissingNamespace),
        1 => return Err(LocatorError::MissingResourcePath),
        _ => {}
    }

    let mut segments = base.segments.clone();
    segments.insert(
        1,
        format!("{DIRECTIVE_SEGMENT_MARKER}{}", pipeline.to_segment_body()),
    );

    let mut url = base.url.clone();
    url.set_path(&join_segments(&segments));
    Ok(url.into())
}

fn join_segments(segments: &[String]) -> String {
    format!("/{}", segments.join("/"))
}
