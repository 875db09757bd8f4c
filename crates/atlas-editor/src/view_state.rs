//! Per-structure view state kept in client-local storage.
//!
//! Collapse flags and the WBS toggle are presentation, not document state:
//! they never enter history and are not sent to the backend.

use atlas_core::{ElementId, StructureTree};
use std::collections::{HashMap, HashSet};

/// String key/value storage owned by the host (browser local storage, a
/// settings file, ...).
pub trait LocalStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
}

/// In-memory store for hosts without persistent storage, and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

pub fn collapsed_key(structure_id: &str) -> String {
    format!("atlas:{structure_id}:collapsed")
}

pub fn show_wbs_key(structure_id: &str) -> String {
    format!("atlas:{structure_id}:show-wbs")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub collapsed: HashSet<ElementId>,
    pub show_wbs: bool,
}

impl ViewState {
    /// Read stored state. `default_show_wbs` applies when nothing was
    /// stored yet. Corrupt values are logged and ignored.
    pub fn load(store: &impl LocalStore, structure_id: &str, default_show_wbs: bool) -> Self {
        let collapsed = match store.get(&collapsed_key(structure_id)) {
            Some(raw) => serde_json::from_str::<Vec<ElementId>>(&raw)
                .map(|ids| ids.into_iter().collect())
                .unwrap_or_else(|err| {
                    log::warn!("ignoring corrupt collapse state for {structure_id}: {err}");
                    HashSet::new()
                }),
            None => HashSet::new(),
        };
        let show_wbs = match store.get(&show_wbs_key(structure_id)).as_deref() {
            Some("true") => true,
            Some("false") => false,
            Some(other) => {
                log::warn!("ignoring corrupt show-wbs flag {other:?} for {structure_id}");
                default_show_wbs
            }
            None => default_show_wbs,
        };
        Self {
            collapsed,
            show_wbs,
        }
    }

    /// Flip one node's collapse flag. Returns the new value.
    pub fn toggle_collapsed(&mut self, id: ElementId) -> bool {
        if self.collapsed.remove(&id) {
            false
        } else {
            self.collapsed.insert(id);
            true
        }
    }

    /// Drop flags for elements `tree` does not contain. Returns true if any
    /// were dropped.
    pub fn prune(&mut self, tree: &StructureTree) -> bool {
        let before = self.collapsed.len();
        self.collapsed.retain(|id| tree.contains(*id));
        self.collapsed.len() != before
    }

    /// Move flags from the ids elements had in `old` to the ids they have
    /// in `new`. A confirmed local element is found in `new` under its
    /// server id. Flags for elements missing from `new` are dropped.
    pub fn follow(&mut self, old: &StructureTree, new: &StructureTree) -> bool {
        let next: HashSet<ElementId> = self
            .collapsed
            .iter()
            .filter_map(|id| {
                if new.contains(*id) {
                    return Some(*id);
                }
                let server = old.get(*id)?.refs.element_id?;
                new.contains(server).then_some(server)
            })
            .collect();
        let changed = next != self.collapsed;
        self.collapsed = next;
        changed
    }

    pub fn persist_collapsed(&self, store: &mut impl LocalStore, structure_id: &str) {
        let mut ids: Vec<&str> = self.collapsed.iter().map(|id| id.as_str()).collect();
        ids.sort_unstable();
        match serde_json::to_string(&ids) {
            Ok(json) => store.set(&collapsed_key(structure_id), json),
            Err(err) => log::warn!("could not store collapse state: {err}"),
        }
    }

    pub fn persist_show_wbs(&self, store: &mut impl LocalStore, structure_id: &str) {
        store.set(&show_wbs_key(structure_id), self.show_wbs.to_string());
    }
}
