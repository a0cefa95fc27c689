//! Project document model.
//!
//! # Responsibility
//! - Define the persisted project record and its creation request.
//! - Validate records before they reach storage.
//!
//! # Invariants
//! - `id` is stable and never reused for another project.
//! - Canvas dimensions are strictly positive.
//! - `canonical_locator` is the only authoritative image URL of a project.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ProjectId = Uuid;

/// Canvas size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Persisted project state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDocument {
    pub id: ProjectId,
    pub title: String,
    /// Locator of the uploaded image before any transformation.
    pub original_locator: String,
    /// Locator currently considered authoritative for the project image.
    pub canonical_locator: String,
    /// JSON scene graph snapshot; `None` until the first flush.
    pub scene_snapshot: Option<String>,
    pub dimensions: Dimensions,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

/// Input for project creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub id: ProjectId,
    pub title: String,
    pub image_locator: String,
    pub dimensions: Dimensions,
}

impl NewProject {
    /// Creates a request with a generated stable id.
    pub fn new(
        title: impl Into<String>,
        image_locator: impl Into<String>,
        dimensions: Dimensions,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            image_locator: image_locator.into(),
            dimensions,
        }
    }

    pub fn validate(&self) -> Result<(), ProjectValidationError> {
        validate_fields(&self.title, &self.image_locator, self.dimensions)
    }
}

/// Working state handed to storage on every flush.
///
/// Replaces locator, snapshot and dimensions of a project as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectStateUpdate {
    pub project_id: ProjectId,
    pub scene_snapshot: String,
    pub canonical_locator: String,
    pub dimensions: Dimensions,
}

impl ProjectStateUpdate {
    pub fn validate(&self) -> Result<(), ProjectValidationError> {
        if self.canonical_locator.trim().is_empty() {
            return Err(ProjectValidationError::EmptyLocator);
        }
        if self.scene_snapshot.trim().is_empty() {
            return Err(ProjectValidationError::EmptySnapshot);
        }
        if self.dimensions.is_empty() {
            return Err(ProjectValidationError::EmptyDimensions(self.dimensions));
        }
        Ok(())
    }
}

impl ProjectDocument {
    pub fn validate(&self) -> Result<(), ProjectValidationError> {
        validate_fields(&self.title, &self.canonical_locator, self.dimensions)?;
        if self.original_locator.trim().is_empty() {
            return Err(ProjectValidationError::EmptyLocator);
        }
        Ok(())
    }
}

fn validate_fields(
    title: &str,
    locator: &str,
    dimensions: Dimensions,
) -> Result<(), ProjectValidationError> {
    if title.trim().is_empty() {
        return Err(ProjectValidationError::EmptyTitle);
    }
    if locator.trim().is_empty() {
        return Err(ProjectValidationError::EmptyLocator);
    }
    if dimensions.is_empty() {
        return Err(ProjectValidationError::EmptyDimensions(dimensions));
    }
    Ok(())
}

/// Project record validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectValidationError {
    EmptyTitle,
    EmptyLocator,
    EmptySnapshot,
    EmptyDimensions(Dimensions),
}

impl Display for ProjectValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "project title must not be empty"),
            Self::EmptyLocator => write!(f, "project image locator must not be empty"),
            Self::EmptySnapshot => write!(f, "scene snapshot must not be empty"),
            Self::EmptyDimensions(dimensions) => write!(
                f,
                "project dimensions must be positive, got {}x{}",
                dimensions.width, dimensions.height
            ),
        }
    }
}

impl Error for ProjectValidationError {}
