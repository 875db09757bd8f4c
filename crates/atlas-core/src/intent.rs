//! Committed mutations, as persisted to the backend.
//!
//! The editor applies a mutation locally, then hands the matching
//! `MutationIntent` to the persistence bridge. Intents are replayable: the
//! session re-applies still-pending intents on top of the last confirmed tree
//! when a backend call fails.

use crate::error::TreeError;
use crate::id::ElementId;
use crate::model::{Element, StructureTree};
use serde::Serialize;
use smallvec::{SmallVec, smallvec};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one logical operation from commit to confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OpId(pub u64);

impl OpId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        OpId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MutationIntent {
    Create {
        id: ElementId,
        parent: ElementId,
        content: String,
    },
    Update {
        id: ElementId,
        content: String,
    },
    Delete {
        id: ElementId,
    },
    Reparent {
        moved: ElementId,
        new_parent: ElementId,
    },
}

impl MutationIntent {
    /// Replay this intent on `tree`.
    pub fn apply(&self, tree: &StructureTree) -> Result<StructureTree, TreeError> {
        match self {
            MutationIntent::Create {
                id,
                parent,
                content,
            } => tree.insert_under(*parent, Element::new(*id, content.clone())),
            MutationIntent::Update { id, content } => tree.rename(*id, content),
            MutationIntent::Delete { id } => tree.remove_node(*id),
            MutationIntent::Reparent { moved, new_parent } => tree.reparent(*moved, *new_parent),
        }
    }

    /// Elements whose persisted state this intent changes.
    pub fn touched(&self) -> SmallVec<[ElementId; 2]> {
        match self {
            MutationIntent::Create { id, .. }
            | MutationIntent::Update { id, .. }
            | MutationIntent::Delete { id } => smallvec![*id],
            MutationIntent::Reparent { moved, new_parent } => smallvec![*moved, *new_parent],
        }
    }
}

impl fmt::Display for MutationIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationIntent::Create { id, parent, .. } => write!(f, "create {id} under {parent}"),
            MutationIntent::Update { id, .. } => write!(f, "update {id}"),
            MutationIntent::Delete { id } => write!(f, "delete {id}"),
            MutationIntent::Reparent { moved, new_parent } => {
                write!(f, "move {moved} under {new_parent}")
            }
        }
    }
}
