//! Canvas runtime capability.

use crate::model::project::Dimensions;
use crate::model::scene::{NodeId, SceneNode};
use kurbo::Point;

/// Rendering surface that owns decoding and drawing.
pub trait Canvas {
    /// Current canvas size in pixels.
    fn viewport(&self) -> Dimensions;
    /// Re-applies `node.filters` to the node's pixels.
    fn apply_filters(&mut self, node: &SceneNode);
    /// Schedules a render pass.
    fn request_render(&mut self);
}

/// Scale that fits `width` x `height` inside `viewport` without upscaling.
pub fn fit_scale(viewport: Dimensions, width: f64, height: f64) -> f64 {
    let scale_x = f64::from(viewport.width) / width;
    let scale_y = f64::from(viewport.height) / height;
    scale_x.min(scale_y).min(1.0)
}

pub fn viewport_center(viewport: Dimensions) -> Point {
    Point::new(
        f64::from(viewport.width) / 2.0,
        f64::from(viewport.height) / 2.0,
    )
}

/// Canvas without a display; records the calls it receives.
///
/// Used by the CLI and by tests.
#[derive(Debug, Clone)]
pub struct HeadlessCanvas {
    viewport: Dimensions,
    render_requests: u64,
    filter_passes: Vec<(NodeId, usize)>,
}

impl HeadlessCanvas {
    pub fn new(viewport: Dimensions) -> Self {
        Self {
            viewport,
            render_requests: 0,
            filter_passes: Vec::new(),
        }
    }

    pub fn render_requests(&self) -> u64 {
        self.render_requests
    }

    /// `(node id, filter count)` for every filter application, in order.
    pub fn filter_passes(&self) -> &[(NodeId, usize)] {
        &self.filter_passes
    }
}

impl Canvas for HeadlessCanvas {
    fn viewport(&self) -> Dimensions {
        self.viewport
    }

    fn apply_filters(&mut self, node: &SceneNode) {
        self.filter_passes.push((node.id, node.filters.len()));
    }

    fn request_render(&mut self) {
        self.render_requests += 1;
    }
}
