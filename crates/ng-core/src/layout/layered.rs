//! Layered (Sugiyama-style) layout.
//!
//! 1. Break cycles by reversing a greedy feedback arc set.
//! 2. Rank by longest path from the sources.
//! 3. Reduce crossings with alternating barycenter sweeps.
//! 4. Assign coordinates: ranks along the flow axis, nodes packed along the
//!    cross axis and pulled toward the mean of their predecessors.

use super::{LayoutEngine, LayoutGraph, LayoutOptions};
use crate::id::NodeId;
use kurbo::Point;
use petgraph::algo::{greedy_feedback_arc_set, toposort};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct LayeredLayout;

impl LayeredLayout {
    pub fn new() -> Self {
        Self
    }
}

impl LayoutEngine for LayeredLayout {
    fn layout(&self, graph: &LayoutGraph, options: &LayoutOptions) -> Vec<(NodeId, Point)> {
        let n = graph.node_count();
        if n == 0 {
            return Vec::new();
        }

        let dag = acyclic(graph);
        let ranks = assign_ranks(&dag);
        let mut layers = build_layers(&ranks);
        order_layers(&mut layers, &dag, options.ordering_sweeps);
        place(graph, &dag, &layers, options)
    }
}

/// Same vertex indices as `graph`, self-loops dropped, cycles broken by
/// reversing the edges of a greedy feedback arc set.
fn acyclic(graph: &LayoutGraph) -> DiGraph<(), ()> {
    let reversed: HashSet<EdgeIndex> = greedy_feedback_arc_set(graph).map(|e| e.id()).collect();

    let mut dag = DiGraph::with_capacity(graph.node_count(), graph.edge_count());
    for _ in graph.node_indices() {
        dag.add_node(());
    }
    for edge in graph.edge_references() {
        let (s, t) = (edge.source(), edge.target());
        if s == t {
            continue;
        }
        if reversed.contains(&edge.id()) {
            dag.update_edge(t, s, ());
        } else {
            dag.update_edge(s, t, ());
        }
    }
    dag
}

fn assign_ranks(dag: &DiGraph<(), ()>) -> Vec<usize> {
    let order = toposort(dag, None).unwrap_or_else(|cycle| {
        log::warn!("layout graph still cyclic at {:?}, ranking in index order", cycle.node_id());
        dag.node_indices().collect()
    });

    let mut ranks = vec![0usize; dag.node_count()];
    for u in order {
        for v in dag.neighbors(u) {
            ranks[v.index()] = ranks[v.index()].max(ranks[u.index()] + 1);
        }
    }
    ranks
}

/// `layers[r]` = vertices at rank `r`, initially in index order.
fn build_layers(ranks: &[usize]) -> Vec<Vec<NodeIndex>> {
    let depth = ranks.iter().copied().max().unwrap_or(0) + 1;
    let mut layers = vec![Vec::new(); depth];
    for (i, &r) in ranks.iter().enumerate() {
        layers[r].push(NodeIndex::new(i));
    }
    layers
}

fn order_layers(layers: &mut [Vec<NodeIndex>], dag: &DiGraph<(), ()>, sweeps: usize) {
    let mut best = layers.to_vec();
    let mut best_crossings = total_crossings(layers, dag);

    for _ in 0..sweeps {
        if best_crossings == 0 {
            break;
        }
        for r in 1..layers.len() {
            reorder(layers, r, dag, petgraph::Direction::Incoming);
        }
        for r in (0..layers.len().saturating_sub(1)).rev() {
            reorder(layers, r, dag, petgraph::Direction::Outgoing);
        }
        let crossings = total_crossings(layers, dag);
        if crossings < best_crossings {
            best_crossings = crossings;
            best = layers.to_vec();
        }
    }
    layers.clone_from_slice(&best);
}

/// Sort layer `r` by the mean position of each vertex's neighbours in the
/// given direction. Vertices without such neighbours keep their slot.
fn reorder(
    layers: &mut [Vec<NodeIndex>],
    r: usize,
    dag: &DiGraph<(), ()>,
    dir: petgraph::Direction,
) {
    let positions = slot_positions(layers, dag.node_count());
    let mut keyed: Vec<(f64, usize, NodeIndex)> = layers[r]
        .iter()
        .enumerate()
        .map(|(slot, &v)| {
            let slots: Vec<f64> = dag
                .neighbors_directed(v, dir)
                .map(|u| positions[u.index()] as f64)
                .collect();
            let key = if slots.is_empty() {
                slot as f64
            } else {
                slots.iter().sum::<f64>() / slots.len() as f64
            };
            (key, slot, v)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    layers[r] = keyed.into_iter().map(|(_, _, v)| v).collect();
}

fn slot_positions(layers: &[Vec<NodeIndex>], n: usize) -> Vec<usize> {
    let mut positions = vec![0; n];
    for layer in layers {
        for (slot, v) in layer.iter().enumerate() {
            positions[v.index()] = slot;
        }
    }
    positions
}

/// Crossings between edges joining the same pair of adjacent layers.
fn total_crossings(layers: &[Vec<NodeIndex>], dag: &DiGraph<(), ()>) -> usize {
    let positions = slot_positions(layers, dag.node_count());
    let mut total = 0;
    for pair in layers.windows(2) {
        let lower: HashSet<NodeIndex> = pair[1].iter().copied().collect();
        let mut edges: Vec<(usize, usize)> = Vec::new();
        for &u in &pair[0] {
            for v in dag.neighbors(u) {
                if lower.contains(&v) {
                    edges.push((positions[u.index()], positions[v.index()]));
                }
            }
        }
        for (i, a) in edges.iter().enumerate() {
            for b in &edges[i + 1..] {
                if (a.0 < b.0 && a.1 > b.1) || (a.0 > b.0 && a.1 < b.1) {
                    total += 1;
                }
            }
        }
    }
    total
}

fn place(
    graph: &LayoutGraph,
    dag: &DiGraph<(), ()>,
    layers: &[Vec<NodeIndex>],
    options: &LayoutOptions,
) -> Vec<(NodeId, Point)> {
    let horizontal = options.rank_dir.is_horizontal();
    // (extent along the flow axis, extent across it)
    let extents = |v: NodeIndex| {
        let w = &graph[v];
        if horizontal {
            (w.width, w.height)
        } else {
            (w.height, w.width)
        }
    };

    // Flow axis: each rank is as thick as its thickest vertex.
    let thickness: Vec<f64> = layers
        .iter()
        .map(|layer| layer.iter().map(|&v| extents(v).0).fold(0.0, f64::max))
        .collect();
    let mut rank_center = Vec::with_capacity(layers.len());
    let mut cursor = options.margin;
    for t in &thickness {
        rank_center.push(cursor + t / 2.0);
        cursor += t + options.rank_sep;
    }
    let flow_total = cursor - options.rank_sep + options.margin;

    // Cross axis: pull toward predecessors, then push apart to honour node_sep.
    let mut cross = vec![0.0f64; graph.node_count()];
    for layer in layers {
        let mut prev_edge = f64::NEG_INFINITY;
        for &v in layer {
            let half = extents(v).1 / 2.0;
            let preds: Vec<f64> = dag
                .neighbors_directed(v, petgraph::Direction::Incoming)
                .map(|u| cross[u.index()])
                .collect();
            let desired = if preds.is_empty() {
                f64::NEG_INFINITY
            } else {
                preds.iter().sum::<f64>() / preds.len() as f64
            };
            let earliest = if prev_edge.is_finite() {
                prev_edge + options.node_sep + half
            } else {
                half
            };
            let center = desired.max(earliest);
            cross[v.index()] = center;
            prev_edge = center + half;
        }
    }

    // Shift the cross axis so the layout starts at the margin.
    let min_cross = graph
        .node_indices()
        .map(|v| cross[v.index()] - extents(v).1 / 2.0)
        .fold(f64::INFINITY, f64::min);
    let shift = options.margin - min_cross;

    let mut out = Vec::with_capacity(graph.node_count());
    for (r, layer) in layers.iter().enumerate() {
        for &v in layer {
            let mut flow = rank_center[r];
            if options.rank_dir.is_reversed() {
                flow = flow_total - flow;
            }
            let across = cross[v.index()] + shift;
            let center = if horizontal {
                Point::new(flow, across)
            } else {
                Point::new(across, flow)
            };
            out.push((graph[v].id, center));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LayoutVertex, RankDir};
    use std::collections::HashMap;

    fn vertex(name: &str) -> LayoutVertex {
        LayoutVertex {
            id: NodeId::intern(name),
            width: 200.0,
            height: 100.0,
        }
    }

    fn centers(graph: &LayoutGraph, options: &LayoutOptions) -> HashMap<NodeId, Point> {
        LayeredLayout::new()
            .layout(graph, options)
            .into_iter()
            .collect()
    }

    fn chain(names: &[&str]) -> LayoutGraph {
        let mut g = LayoutGraph::new();
        let idx: Vec<_> = names.iter().map(|n| g.add_node(vertex(n))).collect();
        for pair in idx.windows(2) {
            g.add_edge(pair[0], pair[1], ());
        }
        g
    }

    #[test]
    fn empty_graph_yields_nothing() {
        assert!(
            LayeredLayout::new()
                .layout(&LayoutGraph::new(), &LayoutOptions::default())
                .is_empty()
        );
    }

    #[test]
    fn chain_flows_left_to_right() {
        let g = chain(&["lr_a", "lr_b", "lr_c"]);
        let c = centers(&g, &LayoutOptions::default());
        let (a, b, cc) = (
            c[&NodeId::intern("lr_a")],
            c[&NodeId::intern("lr_b")],
            c[&NodeId::intern("lr_c")],
        );
        assert!(a.x < b.x && b.x < cc.x);
        assert_eq!(a.y, b.y);
        // 200 wide ranks, 50 apart.
        assert_eq!(b.x - a.x, 250.0);
    }

    #[test]
    fn chain_flows_top_to_bottom() {
        let g = chain(&["tb_a", "tb_b"]);
        let options = LayoutOptions {
            rank_dir: RankDir::TB,
            ..LayoutOptions::default()
        };
        let c = centers(&g, &options);
        let (a, b) = (c[&NodeId::intern("tb_a")], c[&NodeId::intern("tb_b")]);
        assert!(a.y < b.y);
        assert_eq!(a.x, b.x);
    }

    #[test]
    fn right_to_left_mirrors_flow() {
        let g = chain(&["rl_a", "rl_b"]);
        let options = LayoutOptions {
            rank_dir: RankDir::RL,
            ..LayoutOptions::default()
        };
        let c = centers(&g, &options);
        assert!(c[&NodeId::intern("rl_a")].x > c[&NodeId::intern("rl_b")].x);
    }

    #[test]
    fn siblings_in_a_rank_do_not_overlap() {
        let mut g = LayoutGraph::new();
        let root = g.add_node(vertex("fan_root"));
        let kids: Vec<_> = ["fan_1", "fan_2", "fan_3"]
            .iter()
            .map(|n| g.add_node(vertex(n)))
            .collect();
        for &k in &kids {
            g.add_edge(root, k, ());
        }
        let c = centers(&g, &LayoutOptions::default());
        let mut ys: Vec<f64> = ["fan_1", "fan_2", "fan_3"]
            .iter()
            .map(|n| c[&NodeId::intern(n)].y)
            .collect();
        ys.sort_by(f64::total_cmp);
        for pair in ys.windows(2) {
            assert!(pair[1] - pair[0] >= 150.0, "ys too close: {ys:?}");
        }
    }

    #[test]
    fn cycles_are_laid_out() {
        let mut g = chain(&["cy_a", "cy_b", "cy_c"]);
        g.add_edge(NodeIndex::new(2), NodeIndex::new(0), ());
        g.add_edge(NodeIndex::new(1), NodeIndex::new(1), ());
        let c = centers(&g, &LayoutOptions::default());
        assert_eq!(c.len(), 3);
        let xs: HashSet<i64> = c.values().map(|p| p.x as i64).collect();
        assert!(xs.len() >= 2, "cycle collapsed into one rank");
    }

    #[test]
    fn layout_starts_at_margin() {
        let g = chain(&["m_a", "m_b"]);
        let options = LayoutOptions {
            margin: 30.0,
            ..LayoutOptions::default()
        };
        let c = centers(&g, &options);
        let a = c[&NodeId::intern("m_a")];
        assert_eq!(a.x - 100.0, 30.0);
        assert_eq!(a.y - 50.0, 30.0);
    }
}
