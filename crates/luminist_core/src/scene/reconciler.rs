//! Scene reconciler.
//!
//! # Responsibility
//! - Load a transformed resource and swap it in for an existing image node.
//! - Carry geometry and filter stack forward onto the replacement.
//!
//! # Invariants
//! - Node count is unchanged by a successful swap.
//! - On any error the target node stays in place and the selection is kept.
//! - The replacement takes the target's z-index and becomes active.

use crate::model::scene::{Geometry, NodeId, SceneGraph, SceneNode};
use crate::scene::canvas::{fit_scale, viewport_center, Canvas};
use crate::scene::loader::{ImageLoader, LoadError, LoadedImage};
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// How the replacement node is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceMode {
    /// Operation keeps pixel dimensions (flip): geometry copied verbatim.
    PreserveGeometry,
    /// Operation may change dimensions (AI edit): keep center and rotation,
    /// recompute a fit-to-viewport scale.
    FitToViewport,
}

impl ReplaceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreserveGeometry => "preserve_geometry",
            Self::FitToViewport => "fit_to_viewport",
        }
    }
}

/// Reconciliation failures.
#[derive(Debug)]
pub enum ReconcileError {
    Load(LoadError),
    TargetNotFound(NodeId),
    TargetNotImage(NodeId),
    EmptyImage { locator: String },
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load(err) => write!(f, "{err}"),
            Self::TargetNotFound(id) => write!(f, "scene node not found: {id}"),
            Self::TargetNotImage(id) => write!(f, "scene node is not an image: {id}"),
            Self::EmptyImage { locator } => write!(f, "image at `{locator}` has no pixels"),
        }
    }
}

impl Error for ReconcileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LoadError> for ReconcileError {
    fn from(value: LoadError) -> Self {
        Self::Load(value)
    }
}

/// Loads transformed images and reconciles them into a scene graph.
pub struct SceneReconciler<L: ImageLoader> {
    loader: L,
}

impl<L: ImageLoader> SceneReconciler<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Fetches and materializes the resource at `locator`.
    pub async fn materialize(&self, locator: &str) -> Result<LoadedImage, ReconcileError> {
        let image = self.loader.load(locator).await?;
        if image.width == 0 || image.height == 0 {
            return Err(ReconcileError::EmptyImage {
                locator: image.locator,
            });
        }
        Ok(image)
    }

    /// Loads `locator` and swaps it in for `target`.
    pub async fn replace(
        &self,
        graph: &mut SceneGraph,
        canvas: &mut dyn Canvas,
        target: NodeId,
        locator: &str,
        mode: ReplaceMode,
    ) -> Result<NodeId, ReconcileError> {
        check_target(graph, target)?;
        let image = self.materialize(locator).await?;
        swap(graph, canvas, target, image, mode)
    }

    /// Loads `locator` as a new image centered in the viewport and selects it.
    ///
    /// Used for the initial image of a project with no stored scene.
    pub async fn insert_image(
        &self,
        graph: &mut SceneGraph,
        canvas: &mut dyn Canvas,
        locator: &str,
    ) -> Result<NodeId, ReconcileError> {
        let image = self.materialize(locator).await?;
        let viewport = canvas.viewport();
        let width = f64::from(image.width);
        let height = f64::from(image.height);
        let geometry = Geometry::centered_at(
            viewport_center(viewport),
            fit_scale(viewport, width, height),
            0.0,
        );

        let id = graph.add(SceneNode::image(image.locator, width, height, geometry));
        graph.set_active(id);
        canvas.request_render();
        info!(
            "event=scene_insert module=scene status=ok node_id={} nodes={}",
            id,
            graph.len()
        );
        Ok(id)
    }
}

/// Swaps an already materialized image in for `target`.
///
/// The replacement carries the target's filter stack, which is re-applied
/// through `canvas` before the render pass is requested.
pub fn swap(
    graph: &mut SceneGraph,
    canvas: &mut dyn Canvas,
    target: NodeId,
    image: LoadedImage,
    mode: ReplaceMode,
) -> Result<NodeId, ReconcileError> {
    let previous = check_target(graph, target)?;
    if image.width == 0 || image.height == 0 {
        return Err(ReconcileError::EmptyImage {
            locator: image.locator,
        });
    }

    let width = f64::from(image.width);
    let height = f64::from(image.height);
    let geometry = match mode {
        ReplaceMode::PreserveGeometry => previous.geometry,
        ReplaceMode::FitToViewport => Geometry::centered_at(
            previous.center_point(),
            fit_scale(canvas.viewport(), width, height),
            previous.geometry.angle,
        ),
    };

    let mut replacement = SceneNode::image(image.locator, width, height, geometry);
    replacement.filters = previous.filters.clone();
    if !replacement.filters.is_empty() {
        canvas.apply_filters(&replacement);
    }

    let id = replacement.id;
    if graph.replace_node(target, replacement).is_err() {
        error!(
            "event=scene_replace module=scene status=error error_code=target_missing node_id={}",
            target
        );
        return Err(ReconcileError::TargetNotFound(target));
    }
    canvas.request_render();

    debug!(
        "event=scene_replace module=scene status=ok mode={} old_node_id={} node_id={} filters={}",
        mode.as_str(),
        target,
        id,
        graph.get(id).map_or(0, |node| node.filters.len())
    );
    Ok(id)
}

fn check_target(graph: &SceneGraph, target: NodeId) -> Result<&SceneNode, ReconcileError> {
    let node = graph
        .get(target)
        .ok_or(ReconcileError::TargetNotFound(target))?;
    if !node.is_image() {
        return Err(ReconcileError::TargetNotImage(target));
    }
    Ok(node)
}
