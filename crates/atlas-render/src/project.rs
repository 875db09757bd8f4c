//! Projection: outline tree → render-library input.
//!
//! A pure function of the tree and the show-WBS flag. Colors and collapse
//! state are applied to the tree beforehand by their own passes
//! (`assign_colors`, `StructureTree::with_collapsed`); projection only reads
//! them.

use atlas_core::{ElementId, ElementRefs, StructureTree};
use serde::{Deserialize, Serialize};

/// Configuration for label decoration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Maximum label length in characters before truncation. Default: **16**.
    pub label_limit: usize,
    /// Suffix appended to truncated labels. Default: `...`.
    pub ellipsis: String,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            label_limit: 16,
            ellipsis: "...".into(),
        }
    }
}

/// Per-node render state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderState {
    pub collapsed: bool,
}

/// One node as the visualization library consumes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNode {
    pub id: ElementId,
    /// Decorated display label.
    pub content: String,
    /// Undecorated label, for matching a rendered node back to the model.
    pub original_content: String,
    pub wbs: String,
    pub level: u32,
    /// `#RRGGBB` branch color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub state: RenderState,
    #[serde(flatten)]
    pub refs: ElementRefs,
    pub children: Vec<RenderNode>,
}

impl RenderNode {
    /// Find a node in this subtree by id.
    pub fn find(&self, id: ElementId) -> Option<&RenderNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Number of nodes in this subtree.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(RenderNode::count).sum::<usize>()
    }
}

/// Truncate to `limit` characters, appending `ellipsis` when cut.
pub fn truncate(label: &str, limit: usize, ellipsis: &str) -> String {
    match label.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{ellipsis}", &label[..cut]),
        None => label.to_string(),
    }
}

/// Project the whole tree. Returns `None` for an empty tree.
pub fn project(tree: &StructureTree, show_wbs: bool, config: &ProjectionConfig) -> Option<RenderNode> {
    let root = tree.root()?;
    project_node(tree, root, show_wbs, config, true)
}

fn project_node(
    tree: &StructureTree,
    id: ElementId,
    show_wbs: bool,
    config: &ProjectionConfig,
    is_root: bool,
) -> Option<RenderNode> {
    let el = tree.get(id)?;
    let content = if is_root {
        el.content.clone()
    } else {
        let label = truncate(&el.content, config.label_limit, &config.ellipsis);
        if show_wbs {
            format!("{} - {label}", el.wbs)
        } else {
            label
        }
    };
    Some(RenderNode {
        id,
        content,
        original_content: el.content.clone(),
        wbs: el.wbs.clone(),
        level: el.level,
        color: el.color.map(|c| c.to_hex()),
        state: RenderState {
            collapsed: el.state.collapsed,
        },
        refs: el.refs.clone(),
        children: tree
            .children(id)
            .into_iter()
            .filter_map(|c| project_node(tree, c, show_wbs, config, false))
            .collect(),
    })
}
