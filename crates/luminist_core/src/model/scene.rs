//! Scene graph model.
//!
//! # Responsibility
//! - Own the ordered node collection rendered by the canvas runtime.
//! - Track the active/selected node by id.
//! - Serialize the graph into the opaque snapshot stored on a project.
//!
//! # Invariants
//! - Node ids are unique inside one graph.
//! - `active`, when set, always names a node present in `nodes`.
//! - Node replacement keeps the replaced node's z-index.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub type NodeId = Uuid;

/// Visual primitive category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Image,
    Text,
    Shape,
}

/// Horizontal anchor that `Geometry::position` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginX {
    #[default]
    Left,
    Center,
    Right,
}

impl OriginX {
    fn factor(self) -> f64 {
        match self {
            Self::Left => 0.0,
            Self::Center => 0.5,
            Self::Right => 1.0,
        }
    }
}

/// Vertical anchor that `Geometry::position` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginY {
    #[default]
    Top,
    Center,
    Bottom,
}

impl OriginY {
    fn factor(self) -> f64 {
        match self {
            Self::Top => 0.0,
            Self::Center => 0.5,
            Self::Bottom => 1.0,
        }
    }
}

/// Placement of a node on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Canvas coordinates of the origin anchor.
    pub position: Point,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Clockwise rotation in degrees around the origin anchor.
    pub angle: f64,
    pub origin_x: OriginX,
    pub origin_y: OriginY,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            position: Point::ZERO,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            origin_x: OriginX::Left,
            origin_y: OriginY::Top,
        }
    }
}

impl Geometry {
    /// Uniformly scaled geometry anchored at its own center.
    pub fn centered_at(center: Point, scale: f64, angle: f64) -> Self {
        Self {
            position: center,
            scale_x: scale,
            scale_y: scale,
            angle,
            origin_x: OriginX::Center,
            origin_y: OriginY::Center,
        }
    }

    /// Canvas position of the visual center for a `width` x `height` node.
    pub fn center_point(&self, width: f64, height: f64) -> Point {
        let offset = Vec2::new(
            (0.5 - self.origin_x.factor()) * width * self.scale_x,
            (0.5 - self.origin_y.factor()) * height * self.scale_y,
        );
        let rotated = Affine::rotate(self.angle.to_radians()) * offset.to_point();
        self.position + rotated.to_vec2()
    }
}

/// One entry of a node's filter stack; parameters are opaque to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl FilterDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: f64) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

/// Renderable object owned by a `SceneGraph`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub geometry: Geometry,
    /// Native (unscaled) width in pixels.
    pub width: f64,
    /// Native (unscaled) height in pixels.
    pub height: f64,
    #[serde(default)]
    pub filters: Vec<FilterDescriptor>,
    /// Resource locator the pixels were loaded from. Images only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl SceneNode {
    /// Creates an image node with a generated id and no filters.
    pub fn image(source: impl Into<String>, width: f64, height: f64, geometry: Geometry) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: NodeKind::Image,
            geometry,
            width,
            height,
            filters: Vec::new(),
            source: Some(source.into()),
        }
    }

    /// Creates a non-image primitive.
    pub fn primitive(kind: NodeKind, width: f64, height: f64, geometry: Geometry) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            geometry,
            width,
            height,
            filters: Vec::new(),
            source: None,
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind == NodeKind::Image
    }

    pub fn center_point(&self) -> Point {
        self.geometry.center_point(self.width, self.height)
    }
}

/// Ordered node collection plus the active selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active: Option<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    /// Appends a node on top of the z-order and returns its id.
    pub fn add(&mut self, node: SceneNode) -> NodeId {
        let id = node.id;
        self.nodes.push(node);
        id
    }

    /// Removes a node; clears the selection when it pointed at that node.
    pub fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        let index = self.index_of(id)?;
        if self.active == Some(id) {
            self.active = None;
        }
        Some(self.nodes.remove(index))
    }

    pub fn active_id(&self) -> Option<NodeId> {
        self.active
    }

    pub fn active_node(&self) -> Option<&SceneNode> {
        self.active.and_then(|id| self.get(id))
    }

    /// Selects `id`. Returns `false` and leaves selection unchanged when the
    /// node is not part of this graph.
    pub fn set_active(&mut self, id: NodeId) -> bool {
        if self.index_of(id).is_none() {
            return false;
        }
        self.active = Some(id);
        true
    }

    pub fn clear_active(&mut self) {
        self.active = None;
    }

    /// Image node that image tools operate on: the active node when it is an
    /// image, otherwise the bottom-most image in the graph.
    pub fn resolve_active_image(&self) -> Option<&SceneNode> {
        if let Some(node) = self.active_node().filter(|node| node.is_image()) {
            return Some(node);
        }
        self.nodes.iter().find(|node| node.is_image())
    }

    /// Swaps `target` for `replacement` in place and selects the replacement.
    ///
    /// Returns the removed node, or gives `replacement` back when `target`
    /// is missing (graph untouched).
    pub(crate) fn replace_node(
        &mut self,
        target: NodeId,
        replacement: SceneNode,
    ) -> Result<SceneNode, SceneNode> {
        let Some(index) = self.index_of(target) else {
            return Err(replacement);
        };
        let id = replacement.id;
        let previous = std::mem::replace(&mut self.nodes[index], replacement);
        self.active = Some(id);
        Ok(previous)
    }

    /// Serializes the graph into the JSON snapshot stored on a project.
    pub fn to_snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restores a graph from a project snapshot.
    ///
    /// A dangling active reference is dropped instead of failing the load.
    pub fn from_snapshot(snapshot: &str) -> Result<Self, serde_json::Error> {
        let mut graph: SceneGraph = serde_json::from_str(snapshot)?;
        if let Some(id) = graph.active {
            if graph.index_of(id).is_none() {
                graph.active = None;
            }
        }
        Ok(graph)
    }
}
