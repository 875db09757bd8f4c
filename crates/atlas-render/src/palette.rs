//! Color assignment per top-level subtree.
//!
//! Each child of the root takes the next palette color (wrapping around);
//! every descendant inherits its top-level ancestor's color so branches read
//! as visual groups. The root itself stays uncolored.

use atlas_core::{Color, StructureTree};
use serde::{Deserialize, Serialize};

/// Default branch colors (d3 category10).
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#1F77B4", "#FF7F0E", "#2CA02C", "#D62728", "#9467BD", "#8C564B", "#E377C2", "#7F7F7F",
    "#BCBD22", "#17BECF",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::from_hex(DEFAULT_PALETTE)
    }
}

impl Palette {
    /// Build a palette from hex strings. Unparseable entries are skipped.
    pub fn from_hex<S: AsRef<str>>(hex: impl IntoIterator<Item = S>) -> Self {
        let colors = hex
            .into_iter()
            .filter_map(|h| {
                let h = h.as_ref();
                let parsed = Color::from_hex(h);
                if parsed.is_none() {
                    log::warn!("palette: skipping invalid color {h:?}");
                }
                parsed
            })
            .collect();
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Color for the `n`-th branch (wrapping).
    pub fn color(&self, n: usize) -> Option<Color> {
        if self.colors.is_empty() {
            None
        } else {
            Some(self.colors[n % self.colors.len()])
        }
    }
}

/// Return a copy of `tree` with branch colors applied.
#[must_use]
pub fn assign_colors(tree: &StructureTree, palette: &Palette) -> StructureTree {
    let mut out = tree.clone();
    let Some(root) = out.root() else {
        return out;
    };
    out.set_color(root, None);
    for (n, branch) in tree.children(root).into_iter().enumerate() {
        let color = palette.color(n);
        for id in tree.subtree(branch) {
            out.set_color(id, color);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::{Element, ElementId};

    fn id(s: &str) -> ElementId {
        ElementId::intern(s)
    }

    #[test]
    fn branches_share_their_top_level_color() {
        let tree = StructureTree::with_root(Element::new(id("c_root"), "Root"))
            .insert_under(id("c_root"), Element::new(id("c_a"), "A"))
            .and_then(|t| t.insert_under(id("c_root"), Element::new(id("c_b"), "B")))
            .and_then(|t| t.insert_under(id("c_a"), Element::new(id("c_a1"), "A1")))
            .unwrap();
        let palette = Palette::from_hex(["#FF0000", "#00FF00"]);
        let colored = assign_colors(&tree, &palette);

        assert_eq!(colored.get(id("c_root")).unwrap().color, None);
        assert_eq!(colored.get(id("c_a")).unwrap().color, palette.color(0));
        assert_eq!(colored.get(id("c_a1")).unwrap().color, palette.color(0));
        assert_eq!(colored.get(id("c_b")).unwrap().color, palette.color(1));
        // input untouched
        assert_eq!(tree.get(id("c_a")).unwrap().color, None);
    }

    #[test]
    fn palette_wraps_and_skips_garbage() {
        let palette = Palette::from_hex(["#FF0000", "nope", "#0000FF"]);
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.color(2), palette.color(0));
        assert_eq!(Palette::from_hex(Vec::<String>::new()).color(0), None);
    }
}
