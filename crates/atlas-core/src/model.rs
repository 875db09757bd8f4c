//! Core outline data model.
//!
//! A structure is an ordered tree of `Element`s stored in an arena
//! (`petgraph::StableDiGraph`). Edges go parent → child; sibling order is kept
//! explicitly per parent because it is semantically meaningful (it drives
//! WBS numbering).
//!
//! Element payloads live behind `Arc`, so cloning a `StructureTree` copies the
//! index and bumps reference counts only. Writes go through `Arc::make_mut`,
//! which leaves every earlier clone (history snapshots) untouched.

use crate::id::ElementId;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA`. The `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let pair = |i: usize| -> Option<f32> {
            Some((hex_val(bytes[i])? * 16 + hex_val(bytes[i + 1])?) as f32 / 255.0)
        };

        match bytes.len() {
            3 => {
                let r = hex_val(bytes[0])?;
                let g = hex_val(bytes[1])?;
                let b = hex_val(bytes[2])?;
                Some(Self::rgba(
                    (r * 17) as f32 / 255.0,
                    (g * 17) as f32 / 255.0,
                    (b * 17) as f32 / 255.0,
                    1.0,
                ))
            }
            6 => Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, 1.0)),
            8 => Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, pair(6)?)),
            _ => None,
        }
    }

    /// Emit as `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let r = (self.r * 255.0).round() as u8;
        let g = (self.g * 255.0).round() as u8;
        let b = (self.b * 255.0).round() as u8;
        let a = (self.a * 255.0).round() as u8;
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

// ─── Elements ────────────────────────────────────────────────────────────

/// Cross-references to backend entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRefs {
    /// The structure (document) this element belongs to.
    pub structure_id: Option<String>,
    /// Persisted id of the parent element.
    pub parent_id: Option<ElementId>,
    /// Attached rich-content record, if any.
    pub record_id: Option<String>,
    /// The element's own persisted id. `None` until the backend confirms it.
    pub element_id: Option<ElementId>,
}

/// Per-node UI state that travels with the render output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    pub collapsed: bool,
}

/// A single node of the outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,

    /// Canonical label. Render output decorates a copy of it; this field is
    /// never prefixed or truncated.
    pub content: String,

    /// Dotted hierarchical code, e.g. `1.2.3`. Recomputed on every
    /// structural change unless `wbs_pinned` is set.
    pub wbs: String,

    /// Keep `wbs` across renumbering.
    pub wbs_pinned: bool,

    /// Depth from the root (root = 0).
    pub level: u32,

    /// Explicit sibling-order index from the backend.
    pub order: Option<u32>,

    pub refs: ElementRefs,

    /// Display color, assigned per top-level subtree.
    pub color: Option<Color>,

    pub state: NodeState,
}

impl Element {
    pub fn new(id: ElementId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            wbs: String::new(),
            wbs_pinned: false,
            level: 0,
            order: None,
            refs: ElementRefs::default(),
            color: None,
            state: NodeState::default(),
        }
    }

    /// A freshly created, not yet persisted element.
    pub fn local(content: impl Into<String>) -> Self {
        Self::new(ElementId::local(), content)
    }

    /// The id to send to the backend: the persisted id when known.
    pub fn persisted_id(&self) -> ElementId {
        self.refs.element_id.unwrap_or(self.id)
    }
}

// ─── Structure tree ──────────────────────────────────────────────────────

/// An ordered outline tree with at most one root.
#[derive(Clone, Default)]
pub struct StructureTree {
    graph: StableDiGraph<Arc<Element>, ()>,
    root: Option<NodeIndex>,
    id_index: HashMap<ElementId, NodeIndex>,
    child_order: HashMap<NodeIndex, SmallVec<[NodeIndex; 4]>>,
}

impl StructureTree {
    /// An empty tree (no root).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A tree holding a single root element.
    #[must_use]
    pub fn with_root(root: Element) -> Self {
        let mut tree = Self::new();
        let id = root.id;
        let idx = tree.graph.add_node(Arc::new(root));
        tree.id_index.insert(id, idx);
        tree.root = Some(idx);
        tree.renumber();
        tree
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of elements in the tree.
    pub fn len(&self) -> usize {
        self.id_index.len()
    }

    pub fn root(&self) -> Option<ElementId> {
        self.root.map(|idx| self.graph[idx].id)
    }

    pub fn root_element(&self) -> Option<&Element> {
        self.root.map(|idx| self.graph[idx].as_ref())
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.id_index.contains_key(&id)
    }

    /// Look up an element by id.
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.id_index.get(&id).map(|idx| self.graph[*idx].as_ref())
    }

    /// Parent id of an element; `None` for the root or unknown ids.
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        let idx = self.index_of(id)?;
        self.parent_index(idx).map(|p| self.graph[p].id)
    }

    /// Children of an element in sibling order.
    pub fn children(&self, id: ElementId) -> Vec<ElementId> {
        self.index_of(id)
            .map(|idx| {
                self.child_indices(idx)
                    .iter()
                    .map(|c| self.graph[*c].id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All ids in depth-first pre-order.
    pub fn pre_order(&self) -> Vec<ElementId> {
        let mut out = Vec::with_capacity(self.len());
        if let Some(root) = self.root {
            self.collect_pre_order(root, &mut out);
        }
        out
    }

    /// Ids of the subtree rooted at `id`, including `id` itself.
    pub fn subtree(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        if let Some(idx) = self.index_of(id) {
            self.collect_pre_order(idx, &mut out);
        }
        out
    }

    /// Ancestor chain of `id`, nearest parent first.
    pub fn ancestors(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let Some(mut idx) = self.index_of(id) else {
            return out;
        };
        while let Some(parent) = self.parent_index(idx) {
            out.push(self.graph[parent].id);
            idx = parent;
        }
        out
    }

    fn collect_pre_order(&self, idx: NodeIndex, out: &mut Vec<ElementId>) {
        out.push(self.graph[idx].id);
        for &child in self.child_indices(idx) {
            self.collect_pre_order(child, out);
        }
    }

    // ─── Arena plumbing (crate-internal) ────────────────────────────────

    pub(crate) fn root_index(&self) -> Option<NodeIndex> {
        self.root
    }

    pub(crate) fn index_of(&self, id: ElementId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    pub(crate) fn node(&self, idx: NodeIndex) -> &Element {
        &self.graph[idx]
    }

    /// Copy-on-write access to a node's payload.
    pub(crate) fn node_mut(&mut self, idx: NodeIndex) -> &mut Element {
        Arc::make_mut(&mut self.graph[idx])
    }

    pub(crate) fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        let idx = self.index_of(id)?;
        Some(self.node_mut(idx))
    }

    pub(crate) fn parent_index(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
    }

    pub(crate) fn child_indices(&self, idx: NodeIndex) -> &[NodeIndex] {
        self.child_order
            .get(&idx)
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }

    /// Set the root of an empty tree.
    pub(crate) fn set_root(&mut self, element: Element) -> NodeIndex {
        debug_assert!(self.root.is_none());
        let id = element.id;
        let idx = self.graph.add_node(Arc::new(element));
        self.id_index.insert(id, idx);
        self.root = Some(idx);
        idx
    }

    /// Append a new element as the last child of `parent`.
    pub(crate) fn add_child(&mut self, parent: NodeIndex, element: Element) -> NodeIndex {
        let id = element.id;
        let idx = self.graph.add_node(Arc::new(element));
        self.graph.add_edge(parent, idx, ());
        self.child_order.entry(parent).or_default().push(idx);
        self.id_index.insert(id, idx);
        idx
    }

    /// Cut the parent edge of `idx`, leaving it (and its subtree) parentless.
    pub(crate) fn detach(&mut self, idx: NodeIndex) {
        if let Some(parent) = self.parent_index(idx) {
            if let Some(edge) = self.graph.find_edge(parent, idx) {
                self.graph.remove_edge(edge);
            }
            if let Some(order) = self.child_order.get_mut(&parent) {
                order.retain(|c| *c != idx);
            }
        }
    }

    /// Attach a parentless node as the last child of `parent`.
    pub(crate) fn attach(&mut self, parent: NodeIndex, idx: NodeIndex) {
        self.graph.add_edge(parent, idx, ());
        self.child_order.entry(parent).or_default().push(idx);
    }

    /// Drop `idx` and everything beneath it from the arena.
    pub(crate) fn remove_subtree(&mut self, idx: NodeIndex) {
        self.detach(idx);
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            if let Some(children) = self.child_order.remove(&current) {
                stack.extend(children);
            }
            if let Some(removed) = self.graph.remove_node(current) {
                self.id_index.remove(&removed.id);
            }
        }
        if self.root == Some(idx) {
            self.root = None;
        }
    }

    /// Reorder the children of `parent` in place.
    pub(crate) fn sort_children_by<K: Ord>(
        &mut self,
        parent: NodeIndex,
        mut key: impl FnMut(&Element) -> K,
    ) {
        let Some(mut order) = self.child_order.remove(&parent) else {
            return;
        };
        order.sort_by_key(|c| key(&self.graph[*c]));
        self.child_order.insert(parent, order);
    }

    fn eq_subtree(&self, a: NodeIndex, other: &Self, b: NodeIndex) -> bool {
        let (ca, cb) = (self.child_indices(a), other.child_indices(b));
        self.graph[a] == other.graph[b]
            && ca.len() == cb.len()
            && ca
                .iter()
                .zip(cb)
                .all(|(x, y)| self.eq_subtree(*x, other, *y))
    }

    fn fmt_subtree(&self, idx: NodeIndex, depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let el = &self.graph[idx];
        writeln!(
            f,
            "{:indent$}{} {} {:?} (level {})",
            "",
            el.wbs,
            el.id,
            el.content,
            el.level,
            indent = depth * 2
        )?;
        for &child in self.child_indices(idx) {
            self.fmt_subtree(child, depth + 1, f)?;
        }
        Ok(())
    }
}

/// Structural equality: same elements in the same shape and sibling order.
/// Arena indices are irrelevant.
impl PartialEq for StructureTree {
    fn eq(&self, other: &Self) -> bool {
        match (self.root, other.root) {
            (None, None) => true,
            (Some(a), Some(b)) => self.len() == other.len() && self.eq_subtree(a, other, b),
            _ => false,
        }
    }
}

impl fmt::Debug for StructureTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            None => f.write_str("StructureTree(empty)"),
            Some(root) => {
                writeln!(f, "StructureTree")?;
                self.fmt_subtree(root, 1, f)
            }
        }
    }
}
