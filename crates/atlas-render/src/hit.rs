//! Hit testing: point → rendered node lookup.
//!
//! The rendering collaborator reports the on-screen geometry of every drawn
//! node in paint order. Lookups walk it in reverse (last painted = topmost).

use atlas_core::ElementId;
use kurbo::{Affine, Point, Rect};

/// Geometry of one rendered node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeGeometry {
    pub id: ElementId,
    /// Label body, in screen coordinates.
    pub body: Rect,
    /// Collapse-toggle circle bounds, if the node has children.
    pub toggle: Option<Rect>,
    /// The node group's current transform.
    pub transform: Affine,
}

impl NodeGeometry {
    pub fn new(id: ElementId, body: Rect) -> Self {
        Self {
            id,
            body,
            toggle: None,
            transform: Affine::translate((body.x0, body.y0)),
        }
    }

    #[must_use]
    pub fn with_toggle(mut self, toggle: Rect) -> Self {
        self.toggle = Some(toggle);
        self
    }
}

/// All rendered nodes of the last draw, in paint order.
#[derive(Debug, Clone, Default)]
pub struct RenderLayout {
    nodes: Vec<NodeGeometry>,
}

impl RenderLayout {
    pub fn new(nodes: Vec<NodeGeometry>) -> Self {
        Self { nodes }
    }

    pub fn push(&mut self, node: NodeGeometry) {
        self.nodes.push(node);
    }

    pub fn get(&self, id: ElementId) -> Option<&NodeGeometry> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Topmost node whose body contains `point`.
    pub fn hit_test(&self, point: Point) -> Option<ElementId> {
        self.nodes
            .iter()
            .rev()
            .find(|n| n.body.contains(point))
            .map(|n| n.id)
    }

    /// Topmost node whose collapse toggle contains `point`.
    pub fn hit_toggle(&self, point: Point) -> Option<ElementId> {
        self.nodes
            .iter()
            .rev()
            .find(|n| n.toggle.is_some_and(|t| t.contains(point)))
            .map(|n| n.id)
    }

    /// Topmost node under `point`, ignoring the node being dragged.
    pub fn drop_target(&self, point: Point, dragged: ElementId) -> Option<ElementId> {
        self.nodes
            .iter()
            .rev()
            .filter(|n| n.id != dragged)
            .find(|n| n.body.contains(point))
            .map(|n| n.id)
    }
}
