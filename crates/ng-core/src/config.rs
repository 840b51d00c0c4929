//! Canvas configuration.
//!
//! Every field has a default, so a host can deserialize a partial JSON
//! document and override only what it cares about.

use crate::layout::LayoutOptions;
use crate::viewport::{DragZoomTuning, MAX_ZOOM, MIN_ZOOM, WHEEL_STEP};
use serde::{Deserialize, Serialize};

/// Settings key holding the persisted grid size.
pub const GRID_SIZE_KEY: &str = "GridSize";
pub const DEFAULT_GRID_SIZE: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Grid size used until the settings store is consulted.
    pub grid_size: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub wheel_step: f64,
    pub drag_zoom: DragZoomTuning,
    /// Where an auto-created value source lands, relative to the drop point.
    pub stub_offset: (f64, f64),
    /// Class name of the terminal output block with aliased inputs.
    pub terminal_block_class: String,
    /// Pairs of input names on the terminal block that may not both be connected.
    pub exclusive_inputs: Vec<(String, String)>,
    pub layout: LayoutOptions,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            wheel_step: WHEEL_STEP,
            drag_zoom: DragZoomTuning::default(),
            stub_offset: (-200.0, -50.0),
            terminal_block_class: "FragmentOutputBlock".to_string(),
            exclusive_inputs: vec![("rgb".to_string(), "rgba".to_string())],
            layout: LayoutOptions::default(),
        }
    }
}

impl CanvasConfig {
    /// Parse a (possibly partial) JSON configuration.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The input aliased with `name` on the terminal block, if any.
    pub fn exclusive_sibling(&self, name: &str) -> Option<&str> {
        self.exclusive_inputs.iter().find_map(|(a, b)| {
            if a == name {
                Some(b.as_str())
            } else if b == name {
                Some(a.as_str())
            } else {
                None
            }
        })
    }
}
