//! Structural mutations.
//!
//! Every operation borrows the current tree and returns a new one, keyed
//! strictly by `ElementId`. The input is never touched, so a rejected
//! mutation leaves no partial state and earlier snapshots stay valid.
//! Successful structural changes always end with `renumber()`.

use crate::error::TreeError;
use crate::id::ElementId;
use crate::model::{Color, Element, StructureTree};
use std::collections::HashSet;

impl StructureTree {
    /// Remove the subtree rooted at `id`.
    ///
    /// Unknown ids are not an error: the tree comes back unchanged.
    /// The root cannot be removed.
    pub fn remove_node(&self, id: ElementId) -> Result<StructureTree, TreeError> {
        if self.root() == Some(id) {
            return Err(TreeError::RootRemoval);
        }
        let mut out = self.clone();
        let Some(idx) = out.index_of(id) else {
            log::debug!("remove_node: {id} not in tree, nothing to do");
            return Ok(out);
        };
        out.remove_subtree(idx);
        out.renumber();
        Ok(out)
    }

    /// Append `element` as the last child of `target`.
    pub fn insert_under(&self, target: ElementId, mut element: Element) -> Result<StructureTree, TreeError> {
        if element.content.trim().is_empty() {
            return Err(TreeError::EmptyName);
        }
        if self.contains(element.id) {
            return Err(TreeError::DuplicateId(element.id));
        }
        let parent = self.index_of(target).ok_or(TreeError::NotFound(target))?;
        let mut out = self.clone();
        if element.refs.parent_id.is_none() {
            element.refs.parent_id = Some(self.node(parent).persisted_id());
        }
        if element.refs.structure_id.is_none() {
            element.refs.structure_id = self.node(parent).refs.structure_id.clone();
        }
        out.add_child(parent, element);
        out.renumber();
        Ok(out)
    }

    /// True iff an element with `id` sits strictly below `ancestor`.
    pub fn is_descendant(&self, ancestor: ElementId, id: ElementId) -> bool {
        if ancestor == id || !self.contains(ancestor) {
            return false;
        }
        let Some(mut idx) = self.index_of(id) else {
            return false;
        };
        while let Some(parent) = self.parent_index(idx) {
            if self.node(parent).id == ancestor {
                return true;
            }
            idx = parent;
        }
        false
    }

    /// Move the subtree rooted at `moved` to become the last child of
    /// `new_parent`, then renumber.
    ///
    /// Rejects moving the root, moving a node under itself, and moving a node
    /// into its own subtree.
    pub fn reparent(&self, moved: ElementId, new_parent: ElementId) -> Result<StructureTree, TreeError> {
        let moved_idx = self.index_of(moved).ok_or(TreeError::NotFound(moved))?;
        let parent_idx = self
            .index_of(new_parent)
            .ok_or(TreeError::NotFound(new_parent))?;
        if self.root() == Some(moved) {
            return Err(TreeError::RootMove);
        }
        if moved == new_parent {
            return Err(TreeError::SelfParent(moved));
        }
        if self.is_descendant(moved, new_parent) {
            return Err(TreeError::Cycle {
                moved,
                target: new_parent,
            });
        }

        let mut out = self.clone();
        out.detach(moved_idx);
        out.attach(parent_idx, moved_idx);
        let parent_ref = out.node(parent_idx).persisted_id();
        let el = out.node_mut(moved_idx);
        el.refs.parent_id = Some(parent_ref);
        // Appended last; a stale backend order would sort it elsewhere.
        el.order = None;
        out.renumber();
        log::debug!("reparented {moved} under {new_parent}");
        Ok(out)
    }

    /// Change the label of an element.
    pub fn rename(&self, id: ElementId, content: &str) -> Result<StructureTree, TreeError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(TreeError::EmptyName);
        }
        let mut out = self.clone();
        out.element_mut(id).ok_or(TreeError::NotFound(id))?.content = content.to_string();
        Ok(out)
    }

    /// Record the backend id of an element once the server has confirmed it.
    /// Children that referenced the element as parent are pointed at it too.
    pub fn set_element_id(&self, id: ElementId, persisted: ElementId) -> Result<StructureTree, TreeError> {
        let mut out = self.clone();
        out.element_mut(id).ok_or(TreeError::NotFound(id))?.refs.element_id = Some(persisted);
        for child in out.children(id) {
            if let Some(el) = out.element_mut(child) {
                el.refs.parent_id = Some(persisted);
            }
        }
        Ok(out)
    }

    /// Set the display color of one element in place. Returns false for
    /// unknown ids. Colors are display-only, so this needs no renumbering.
    pub fn set_color(&mut self, id: ElementId, color: Option<Color>) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        if self.node(idx).color != color {
            self.node_mut(idx).color = color;
        }
        true
    }

    /// Stamp `state.collapsed` from a set of collapsed ids. Elements not in
    /// the set are expanded.
    #[must_use]
    pub fn with_collapsed(&self, collapsed: &HashSet<ElementId>) -> StructureTree {
        let mut out = self.clone();
        for id in out.pre_order() {
            let want = collapsed.contains(&id);
            if out.get(id).is_some_and(|el| el.state.collapsed != want)
                && let Some(el) = out.element_mut(id)
            {
                el.state.collapsed = want;
            }
        }
        out
    }
}
