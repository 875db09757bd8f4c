pub mod error;
pub mod export;
pub mod filter;
pub mod id;
pub mod import;
pub mod intent;
pub mod model;
pub mod mutate;
pub mod wbs;

pub use error::TreeError;
pub use export::{ExportConfig, ExportNode, export_html, sanitize};
pub use filter::{LevelFilter, filter_by_level};
pub use id::ElementId;
pub use import::{
    ElementPayload, RootPolicy, StructurePayload, hydrate, hydrate_with, parse_raw_tree,
    synthetic_root_id, to_raw_json,
};
pub use intent::{MutationIntent, OpId};
pub use model::*;
pub use wbs::{WbsCode, assign_levels, assign_wbs};
