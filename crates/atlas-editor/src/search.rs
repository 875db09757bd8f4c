//! Filter-by-level search with input debouncing.
//!
//! The clock is passed in by the caller so the debounce window can be
//! driven deterministically by the host's own timer (and by tests).

use atlas_core::{LevelFilter, StructureTree, filter_by_level};
use std::time::{Duration, Instant};

/// Debounced level input. Rapid edits coalesce to the last value once the
/// window has elapsed.
#[derive(Debug, Clone)]
pub struct LevelSearch {
    debounce: Duration,
    pending: Option<(Option<u32>, Instant)>,
    active: Option<u32>,
}

impl LevelSearch {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: None,
            active: None,
        }
    }

    /// Record a new input value. `None` clears the search.
    pub fn input(&mut self, level: Option<u32>, now: Instant) {
        self.pending = Some((level, now));
    }

    /// Record raw text from the search box. Blank or non-numeric text
    /// clears the search.
    pub fn input_text(&mut self, text: &str, now: Instant) {
        let text = text.trim();
        let level = if text.is_empty() {
            None
        } else {
            text.parse::<u32>().ok().or_else(|| {
                log::debug!("search input {text:?} is not a level, clearing");
                None
            })
        };
        self.input(level, now);
    }

    /// Settle the pending input if its window has elapsed. Returns the newly
    /// active level (`Some(None)` when the search was cleared), or `None`
    /// when nothing changed.
    pub fn poll(&mut self, now: Instant) -> Option<Option<u32>> {
        let (level, at) = self.pending?;
        if now.saturating_duration_since(at) < self.debounce {
            return None;
        }
        self.pending = None;
        if level == self.active {
            return None;
        }
        self.active = level;
        Some(level)
    }

    /// Level currently applied to the view.
    pub fn active(&self) -> Option<u32> {
        self.active
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop any pending input and clear the active level.
    pub fn clear(&mut self) {
        self.pending = None;
        self.active = None;
    }
}

/// What the map should show for the active search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchView {
    /// No search: the whole tree.
    All,
    /// Matching nodes and their ancestor chains.
    Filtered(StructureTree),
    /// The search ran and nothing is at that level.
    NoResults,
    /// Nothing loaded yet.
    NoData,
}

impl SearchView {
    pub fn resolve(tree: &StructureTree, level: Option<u32>) -> Self {
        if tree.is_empty() {
            return SearchView::NoData;
        }
        let Some(level) = level else {
            return SearchView::All;
        };
        match filter_by_level(tree, level) {
            LevelFilter::NoData => SearchView::NoData,
            LevelFilter::NoResults => SearchView::NoResults,
            LevelFilter::Matches(filtered) => SearchView::Filtered(filtered),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::{Element, ElementId};
    use pretty_assertions::assert_eq;

    const WINDOW: Duration = Duration::from_millis(300);

    #[test]
    fn rapid_input_coalesces_to_last_value() {
        let t0 = Instant::now();
        let mut search = LevelSearch::new(WINDOW);
        search.input(Some(1), t0);
        search.input(Some(2), t0 + Duration::from_millis(100));
        assert_eq!(search.poll(t0 + Duration::from_millis(350)), None);
        assert_eq!(search.poll(t0 + Duration::from_millis(400)), Some(Some(2)));
        assert_eq!(search.active(), Some(2));
        assert!(!search.is_pending());
    }

    #[test]
    fn clearing_restores_full_view() {
        let t0 = Instant::now();
        let mut search = LevelSearch::new(WINDOW);
        search.input_text("3", t0);
        assert_eq!(search.poll(t0 + WINDOW), Some(Some(3)));
        search.input_text("  ", t0 + WINDOW);
        assert_eq!(search.poll(t0 + WINDOW * 2), Some(None));
        assert_eq!(search.active(), None);
    }

    #[test]
    fn unchanged_value_reports_nothing() {
        let t0 = Instant::now();
        let mut search = LevelSearch::new(WINDOW);
        search.input(None, t0);
        assert_eq!(search.poll(t0 + WINDOW), None);
    }

    #[test]
    fn views() {
        assert_eq!(SearchView::resolve(&StructureTree::new(), Some(1)), SearchView::NoData);

        let root = ElementId::intern("s_root");
        let tree = StructureTree::with_root(Element::new(root, "Root"))
            .insert_under(root, Element::new(ElementId::intern("s_a"), "A"))
            .unwrap();
        assert_eq!(SearchView::resolve(&tree, None), SearchView::All);
        assert_eq!(SearchView::resolve(&tree, Some(5)), SearchView::NoResults);
        assert!(matches!(
            SearchView::resolve(&tree, Some(1)),
            SearchView::Filtered(t) if t.len() == 2
        ));
    }
}
