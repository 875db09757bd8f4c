//! WBS numbering and level assignment passes.
//!
//! Both passes walk the tree once, depth-first, pre-order. A node's code is
//! `parent.wbs + "." + (1-based sibling index)`; the root is always `1` at
//! level 0. A pinned node keeps its code, and its children number from it.

use crate::error::TreeError;
use crate::id::ElementId;
use crate::model::StructureTree;
use petgraph::graph::NodeIndex;
use std::fmt;
use winnow::ascii::digit1;
use winnow::combinator::separated;
use winnow::error::ContextError;
use winnow::prelude::*;

/// Code stamped on the root of every structure.
pub const ROOT_WBS: &str = "1";

// ─── WBS codes ───────────────────────────────────────────────────────────

/// A parsed dotted WBS code such as `1.2.3`. Every segment is ≥ 1.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WbsCode(Vec<u32>);

fn segment(input: &mut &str) -> ModalResult<u32> {
    digit1
        .try_map(str::parse::<u32>)
        .verify(|n: &u32| *n > 0)
        .parse_next(input)
}

fn code(input: &mut &str) -> ModalResult<Vec<u32>> {
    separated(1.., segment, '.').parse_next(input)
}

impl WbsCode {
    /// Parse a dotted code. Surrounding whitespace is ignored.
    pub fn parse(text: &str) -> Result<Self, TreeError> {
        code.parse(text.trim())
            .map(WbsCode)
            .map_err(|_: winnow::error::ParseError<&str, ContextError>| {
                TreeError::InvalidWbs(text.to_string())
            })
    }

    pub fn segments(&self) -> &[u32] {
        &self.0
    }

    /// Number of segments; `1` has depth 1.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Code of the `n`-th (1-based) child.
    pub fn child(&self, n: u32) -> Self {
        let mut segments = self.0.clone();
        segments.push(n);
        WbsCode(segments)
    }
}

impl fmt::Display for WbsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for seg in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{seg}")?;
            first = false;
        }
        Ok(())
    }
}

// ─── Passes ──────────────────────────────────────────────────────────────

/// Return a copy of `tree` with every `wbs` recomputed from position.
/// An empty tree yields an empty tree.
#[must_use]
pub fn assign_wbs(tree: &StructureTree) -> StructureTree {
    let mut out = tree.clone();
    out.stamp_wbs();
    out
}

/// Return a copy of `tree` with every `level` recomputed, root at `base`.
#[must_use]
pub fn assign_levels(tree: &StructureTree, base: u32) -> StructureTree {
    let mut out = tree.clone();
    out.stamp_levels(base);
    out
}

impl StructureTree {
    /// Recompute `wbs` and `level` in place. Every structural change ends here.
    pub fn renumber(&mut self) {
        self.stamp_wbs();
        self.stamp_levels(0);
    }

    pub(crate) fn stamp_wbs(&mut self) {
        let Some(root) = self.root_index() else {
            return;
        };
        set_wbs(self, root, ROOT_WBS);
        let mut stack: Vec<NodeIndex> = vec![root];
        while let Some(idx) = stack.pop() {
            let prefix = self.node(idx).wbs.clone();
            let children = self.child_indices(idx).to_vec();
            for (i, child) in children.iter().enumerate() {
                if !self.node(*child).wbs_pinned {
                    set_wbs(self, *child, &format!("{prefix}.{}", i + 1));
                }
            }
            // Reverse so siblings pop in order; keeps the walk pre-order.
            stack.extend(children.into_iter().rev());
        }
    }

    pub(crate) fn stamp_levels(&mut self, base: u32) {
        let Some(root) = self.root_index() else {
            return;
        };
        let mut stack = vec![(root, base)];
        while let Some((idx, level)) = stack.pop() {
            if self.node(idx).level != level {
                self.node_mut(idx).level = level;
            }
            for &child in self.child_indices(idx).iter().rev() {
                stack.push((child, level + 1));
            }
        }
    }

    /// Sort every sibling list by the backend's explicit `order` index.
    /// Elements without an index keep their relative order after indexed ones.
    pub fn sort_by_order(&mut self) {
        for id in self.pre_order() {
            if let Some(idx) = self.index_of(id) {
                self.sort_children_by(idx, |el| (el.order.is_none(), el.order));
            }
        }
    }

    /// Pin an explicit WBS code on an element so renumbering keeps it.
    pub fn pin_wbs(&self, id: ElementId, code: &str) -> Result<StructureTree, TreeError> {
        let parsed = WbsCode::parse(code)?;
        let mut out = self.clone();
        if out.root() == Some(id) {
            log::debug!("ignoring WBS pin on root {id}");
            return Ok(out);
        }
        let el = out.element_mut(id).ok_or(TreeError::NotFound(id))?;
        el.wbs = parsed.to_string();
        el.wbs_pinned = true;
        out.renumber();
        Ok(out)
    }

    /// Drop a pinned code; the element numbers from its position again.
    pub fn unpin_wbs(&self, id: ElementId) -> Result<StructureTree, TreeError> {
        let mut out = self.clone();
        out.element_mut(id).ok_or(TreeError::NotFound(id))?.wbs_pinned = false;
        out.renumber();
        Ok(out)
    }
}

/// Write only when the value changes, so untouched nodes stay shared with
/// earlier snapshots.
fn set_wbs(tree: &mut StructureTree, idx: NodeIndex, wbs: &str) {
    if tree.node(idx).wbs != wbs {
        tree.node_mut(idx).wbs = wbs.to_string();
    }
}
