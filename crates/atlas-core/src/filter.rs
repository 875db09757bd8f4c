//! Filter an outline down to one level.
//!
//! The result keeps every element at the requested level plus the ancestor
//! chain needed to connect it to the root. Descendants of matches are
//! dropped. Codes and levels from the source tree are kept as-is so the
//! filtered view still shows where each element lives in the full outline.

use crate::id::ElementId;
use crate::model::StructureTree;
use std::collections::HashSet;

/// Outcome of a level filter.
#[derive(Debug, Clone, PartialEq)]
pub enum LevelFilter {
    /// The source tree has no elements at all.
    NoData,
    /// The tree has elements, but none at the requested level.
    NoResults,
    /// The connected subtree of matches and their ancestors.
    Matches(StructureTree),
}

impl LevelFilter {
    pub fn is_no_results(&self) -> bool {
        matches!(self, LevelFilter::NoResults)
    }
}

pub fn filter_by_level(tree: &StructureTree, level: u32) -> LevelFilter {
    let Some(root) = tree.root_element() else {
        return LevelFilter::NoData;
    };

    let matches: Vec<ElementId> = tree
        .pre_order()
        .into_iter()
        .filter(|id| tree.get(*id).is_some_and(|el| el.level == level))
        .collect();
    if matches.is_empty() {
        return LevelFilter::NoResults;
    }

    let mut keep: HashSet<ElementId> = HashSet::with_capacity(matches.len() * 2);
    for id in &matches {
        keep.insert(*id);
        keep.extend(tree.ancestors(*id));
    }

    let mut out = StructureTree::new();
    let root_idx = out.set_root(root.clone());
    copy_kept(tree, root.id, &mut out, root_idx, &keep);
    log::debug!(
        "level filter {level}: {} matches, {} elements kept",
        matches.len(),
        keep.len()
    );
    LevelFilter::Matches(out)
}

fn copy_kept(
    src: &StructureTree,
    id: ElementId,
    dst: &mut StructureTree,
    dst_idx: petgraph::graph::NodeIndex,
    keep: &HashSet<ElementId>,
) {
    for child in src.children(id) {
        if !keep.contains(&child) {
            continue;
        }
        let Some(el) = src.get(child) else {
            continue;
        };
        let child_idx = dst.add_child(dst_idx, el.clone());
        copy_kept(src, child, dst, child_idx, keep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Element;

    fn id(s: &str) -> ElementId {
        ElementId::intern(s)
    }

    /// Root → A → (A1 → A1x), B
    fn tree() -> StructureTree {
        StructureTree::with_root(Element::new(id("f_root"), "Root"))
            .insert_under(id("f_root"), Element::new(id("f_a"), "A"))
            .and_then(|t| t.insert_under(id("f_root"), Element::new(id("f_b"), "B")))
            .and_then(|t| t.insert_under(id("f_a"), Element::new(id("f_a1"), "A1")))
            .and_then(|t| t.insert_under(id("f_a1"), Element::new(id("f_a1x"), "A1x")))
            .unwrap()
    }

    #[test]
    fn single_match_keeps_ancestor_chain() {
        let LevelFilter::Matches(filtered) = filter_by_level(&tree(), 2) else {
            panic!("expected matches");
        };
        assert_eq!(filtered.pre_order(), vec![id("f_root"), id("f_a"), id("f_a1")]);
        assert_eq!(filtered.get(id("f_a1")).unwrap().wbs, "1.1.1");
    }

    #[test]
    fn level_one_keeps_siblings_only() {
        let LevelFilter::Matches(filtered) = filter_by_level(&tree(), 1) else {
            panic!("expected matches");
        };
        assert_eq!(filtered.pre_order(), vec![id("f_root"), id("f_a"), id("f_b")]);
    }

    #[test]
    fn no_match_is_distinct_from_no_data() {
        assert!(filter_by_level(&tree(), 9).is_no_results());
        assert_eq!(filter_by_level(&StructureTree::new(), 1), LevelFilter::NoData);
    }
}
