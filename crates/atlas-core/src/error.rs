//! Errors raised by tree validation, structural mutations, and parsing.

use crate::id::ElementId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("element name must not be empty")]
    EmptyName,

    #[error("the root element represents the whole structure and cannot be removed")]
    RootRemoval,

    #[error("the root element cannot be moved")]
    RootMove,

    #[error("element {0} not found")]
    NotFound(ElementId),

    #[error("element {0} already exists in this structure")]
    DuplicateId(ElementId),

    #[error("element {0} cannot become its own parent")]
    SelfParent(ElementId),

    #[error("cannot move {moved} under {target}: {target} is inside the subtree of {moved}")]
    Cycle { moved: ElementId, target: ElementId },

    #[error("invalid WBS code {0:?}")]
    InvalidWbs(String),

    #[error("malformed outline JSON: {0}")]
    Parse(String),

    #[error("the structure has no elements")]
    EmptyTree,
}

impl From<serde_json::Error> for TreeError {
    fn from(err: serde_json::Error) -> Self {
        TreeError::Parse(err.to_string())
    }
}
