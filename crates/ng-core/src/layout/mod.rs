//! Automatic layout adapter.
//!
//! Translates the canvas graph into a plain `petgraph` digraph of sized
//! vertices, hands it to a [`LayoutEngine`], and writes the returned
//! positions back onto the nodes. Engines report vertex **centers**; the
//! model stores **top-left** corners, snapped to the grid.

mod layered;

pub use layered::LayeredLayout;

use crate::block::BlockLayer;
use crate::graph::GraphModel;
use crate::id::NodeId;
use crate::viewport::grid_snap;
use kurbo::Point;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Flow axis of the layered layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum RankDir {
    /// Top to bottom.
    TB,
    /// Bottom to top.
    BT,
    /// Left to right.
    #[default]
    LR,
    /// Right to left.
    RL,
}

impl RankDir {
    pub fn is_horizontal(self) -> bool {
        matches!(self, RankDir::LR | RankDir::RL)
    }

    pub fn is_reversed(self) -> bool {
        matches!(self, RankDir::BT | RankDir::RL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub rank_dir: RankDir,
    /// Gap between neighbours within a rank.
    pub node_sep: f64,
    /// Gap between consecutive ranks.
    pub rank_sep: f64,
    /// Distance of the layout's top-left edge from the world origin.
    pub margin: f64,
    /// Crossing-reduction sweeps (each sweep is one down and one up pass).
    pub ordering_sweeps: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            rank_dir: RankDir::LR,
            node_sep: 50.0,
            rank_sep: 50.0,
            margin: 0.0,
            ordering_sweeps: 4,
        }
    }
}

/// A vertex handed to the layout engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutVertex {
    pub id: NodeId,
    pub width: f64,
    pub height: f64,
}

pub type LayoutGraph = DiGraph<LayoutVertex, ()>;

/// A hierarchical layout algorithm.
pub trait LayoutEngine {
    /// Center position for each vertex of `graph`.
    fn layout(&self, graph: &LayoutGraph, options: &LayoutOptions) -> Vec<(NodeId, Point)>;
}

/// Vertices are the canvas nodes; there is one edge per distinct
/// (source node → destination node) pair, derived from the block-level
/// endpoints of each node's outputs.
pub fn build_layout_graph(model: &GraphModel, blocks: &impl BlockLayer) -> LayoutGraph {
    let mut graph = LayoutGraph::with_capacity(model.nodes().len(), model.links().len());
    let mut by_block: HashMap<_, NodeIndex> = HashMap::new();

    for node in model.nodes() {
        let idx = graph.add_node(LayoutVertex {
            id: node.id,
            width: node.width,
            height: node.height,
        });
        by_block.entry(node.block).or_insert(idx);
    }

    for node in model.nodes() {
        let Some(&from) = by_block.get(&node.block) else {
            continue;
        };
        for output in node.outputs() {
            for endpoint in blocks.endpoints(output.point) {
                if let Some(&to) = by_block.get(&endpoint.block) {
                    graph.update_edge(from, to, ());
                }
            }
        }
    }
    graph
}

/// Lay the whole graph out and move every node to its snapped position.
/// Returns the number of nodes moved.
pub fn distribute_graph(
    model: &mut GraphModel,
    blocks: &impl BlockLayer,
    engine: &impl LayoutEngine,
    options: &LayoutOptions,
    grid_size: f64,
) -> usize {
    let graph = build_layout_graph(model, blocks);
    log::debug!(
        "distributing {} nodes / {} edges ({:?})",
        graph.node_count(),
        graph.edge_count(),
        options.rank_dir
    );

    let mut moved = 0;
    for (id, center) in engine.layout(&graph, options) {
        let Some(node) = model.node_mut(id) else {
            log::warn!("layout returned unknown node {id}");
            continue;
        };
        node.x = grid_snap(center.x - node.width / 2.0, grid_size);
        node.y = grid_snap(center.y - node.height / 2.0, grid_size);
        moved += 1;
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockId, PointId, ValueType};
    use crate::registry::{BlockDecl, BlockRegistry};

    fn passthrough(reg: &mut BlockRegistry, name: &str) -> BlockId {
        reg.add(
            BlockDecl::new(name)
                .input("in", ValueType::Float)
                .input("aux", ValueType::Float)
                .output("out", ValueType::Float),
        )
    }

    #[test]
    fn one_edge_per_node_pair() {
        let mut reg = BlockRegistry::new();
        let a = passthrough(&mut reg, "A");
        let b = passthrough(&mut reg, "B");
        reg.connect(PointId::output(a, 0), PointId::input(b, 0));
        reg.connect(PointId::output(a, 0), PointId::input(b, 1));

        let mut model = GraphModel::new();
        model.append_node(a, &reg);
        model.append_node(b, &reg);

        let graph = build_layout_graph(&model, &reg);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn endpoints_off_canvas_are_skipped() {
        let mut reg = BlockRegistry::new();
        let a = passthrough(&mut reg, "A");
        let hidden = passthrough(&mut reg, "Hidden");
        reg.connect(PointId::output(a, 0), PointId::input(hidden, 0));

        let mut model = GraphModel::new();
        model.append_node(a, &reg);

        let graph = build_layout_graph(&model, &reg);
        assert_eq!(graph.edge_count(), 0);
    }

    struct Fixed(Point);

    impl LayoutEngine for Fixed {
        fn layout(&self, graph: &LayoutGraph, _: &LayoutOptions) -> Vec<(NodeId, Point)> {
            graph
                .node_weights()
                .map(|v| (v.id, self.0))
                .collect()
        }
    }

    #[test]
    fn distribute_converts_center_to_snapped_corner() {
        let mut reg = BlockRegistry::new();
        let a = passthrough(&mut reg, "A");
        let mut model = GraphModel::new();
        let id = model.append_node(a, &reg);

        let moved = distribute_graph(
            &mut model,
            &reg,
            &Fixed(Point::new(333.0, 171.0)),
            &LayoutOptions::default(),
            20.0,
        );
        assert_eq!(moved, 1);
        let node = model.node(id).unwrap();
        // 333 - 100 = 233 → 240; 171 - 50 = 121 → 120
        assert_eq!((node.x, node.y), (240.0, 120.0));
    }
}
