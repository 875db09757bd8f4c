//! Editor configuration.
//!
//! Every field has a default, so an override file only needs the keys it
//! changes.

use crate::interaction::InteractionConfig;
use atlas_bridge::BridgeConfig;
use atlas_core::{ExportConfig, TreeError};
use atlas_render::{Palette, ProjectionConfig, palette::DEFAULT_PALETTE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Label truncation for rendered nodes.
    pub projection: ProjectionConfig,

    /// Maximum undo depth. Default: **100**.
    pub history_depth: usize,

    /// Quiet period before a level search is applied. Default: **300** ms.
    pub search_debounce_ms: u64,

    /// Pointer travel that turns a press into a drag. Default: **4.0**.
    pub drag_threshold: f64,

    /// Branch colors as hex strings. Default: d3 category10.
    pub palette: Vec<String>,

    /// Defaults for HTML export.
    pub export: ExportConfig,

    pub bridge: BridgeConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            projection: ProjectionConfig::default(),
            history_depth: 100,
            search_debounce_ms: 300,
            drag_threshold: InteractionConfig::default().drag_threshold,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            export: ExportConfig::default(),
            bridge: BridgeConfig::default(),
        }
    }
}

impl EditorConfig {
    /// Load overrides from JSON. Missing keys keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, TreeError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn palette(&self) -> Palette {
        Palette::from_hex(&self.palette)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn interaction(&self) -> InteractionConfig {
        InteractionConfig {
            drag_threshold: self.drag_threshold,
        }
    }
}
