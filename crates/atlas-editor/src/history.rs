//! Undo/redo over whole-document snapshots.
//!
//! Each entry is an immutable tree snapshot. Trees share unchanged nodes,
//! so keeping many entries costs little more than the nodes that changed.

/// Linear undo/redo stack with a single present state.
#[derive(Debug, Clone)]
pub struct History<T: Clone> {
    past: Vec<T>,
    present: T,
    future: Vec<T>,
    /// Maximum undo depth. `None` keeps everything.
    max_depth: Option<usize>,
}

impl<T: Clone> History<T> {
    pub fn new(present: T) -> Self {
        Self {
            past: Vec::new(),
            present,
            future: Vec::new(),
            max_depth: None,
        }
    }

    pub fn with_max_depth(present: T, max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
            ..Self::new(present)
        }
    }

    pub fn present(&self) -> &T {
        &self.present
    }

    /// Commit a new present. Clears redo.
    pub fn set(&mut self, next: T) {
        let prev = std::mem::replace(&mut self.present, next);
        self.past.push(prev);
        if let Some(max) = self.max_depth
            && self.past.len() > max
        {
            self.past.remove(0);
        }
        self.future.clear();
    }

    /// Step back. Returns false if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(prev) = self.past.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, prev);
        self.future.push(current);
        true
    }

    /// Step forward. Returns false if there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.future.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, next);
        self.past.push(current);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Swap the present without recording an entry. Used when the backend
    /// overrules the optimistic state.
    pub fn replace_present(&mut self, present: T) {
        self.present = present;
    }

    /// Drop all entries and start over from `present`.
    pub fn reset(&mut self, present: T) {
        self.past.clear();
        self.future.clear();
        self.present = present;
    }

    /// Rewrite every entry, e.g. to record a server-assigned id everywhere.
    pub fn map_all(&mut self, mut f: impl FnMut(&T) -> T) {
        for entry in self.past.iter_mut().chain(self.future.iter_mut()) {
            *entry = f(entry);
        }
        self.present = f(&self.present);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn undo_then_redo() {
        let mut h = History::new("s0");
        h.set("s1");
        h.set("s2");
        assert!(h.undo());
        assert_eq!(*h.present(), "s1");
        assert!(h.can_redo());
        assert!(h.redo());
        assert_eq!(*h.present(), "s2");
        assert!(!h.can_redo());
    }

    #[test]
    fn set_after_undo_clears_redo() {
        let mut h = History::new(0);
        h.set(1);
        h.set(2);
        h.undo();
        h.set(3);
        assert!(!h.can_redo());
        assert!(!h.redo());
        h.undo();
        assert_eq!(*h.present(), 1);
    }

    #[test]
    fn empty_stacks_are_noops() {
        let mut h = History::new(5);
        assert!(!h.can_undo());
        assert!(!h.undo());
        assert!(!h.redo());
        assert_eq!(*h.present(), 5);
    }

    #[test]
    fn max_depth_drops_oldest() {
        let mut h = History::with_max_depth(0, 2);
        for n in 1..=4 {
            h.set(n);
        }
        assert!(h.undo());
        assert!(h.undo());
        assert!(!h.undo());
        assert_eq!(*h.present(), 2);
    }

    #[test]
    fn replace_present_keeps_entries() {
        let mut h = History::new(1);
        h.set(2);
        h.replace_present(20);
        assert!(h.can_undo());
        h.undo();
        assert_eq!(*h.present(), 1);
        h.redo();
        assert_eq!(*h.present(), 20);
    }

    #[test]
    fn map_all_touches_every_entry() {
        let mut h = History::new(1);
        h.set(2);
        h.set(3);
        h.undo();
        h.map_all(|n| n * 10);
        assert_eq!(*h.present(), 20);
        h.redo();
        assert_eq!(*h.present(), 30);
        h.undo();
        h.undo();
        assert_eq!(*h.present(), 10);
    }
}
