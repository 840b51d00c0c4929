//! Outbound notifications of the canvas.

use crate::selection::Selection;
use ng_core::{Affine, Channel, NodeId, Point, PointId};

#[derive(Debug, Default)]
pub struct CanvasEvents {
    pub selection_changed: Channel<Selection>,
    pub candidate_port_hovered: Channel<Option<PointId>>,
    /// Screen position of the candidate link's free end; `None` when the drag ends.
    pub candidate_link_moved: Channel<Option<Point>>,
    pub error_message: Channel<String>,
    /// The block graph changed and must be recompiled.
    pub rebuild_required: Channel<()>,
    /// A node's visuals are stale (e.g. a new link arrived on it).
    pub node_refresh: Channel<NodeId>,
    /// Pan or zoom changed; carries the new world → screen transform.
    pub transform_changed: Channel<Affine>,
    pub grid_size_changed: Channel<f64>,
}

impl CanvasEvents {
    pub fn new() -> Self {
        Self::default()
    }
}
