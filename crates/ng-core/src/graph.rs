//! Canvas graph model: nodes wrapping blocks, their ports, and the
//! committed links between them.
//!
//! Two invariants hold for the link collection at all times:
//! - no two links join the same unordered pair of points;
//! - every link is stored Output → Input (`port_a` is the output).
//!
//! The at-most-one-incoming-link rule is enforced by the connection
//! resolver before it calls [`GraphModel::connect_ports`].

use crate::block::{BlockId, BlockLayer, Direction, PointId};
use crate::id::{LinkId, NodeId};
use kurbo::{Point, Rect, Size};
use smallvec::SmallVec;

/// Default node size until the presentation layer reports the real one.
pub const DEFAULT_NODE_SIZE: Size = Size::new(200.0, 100.0);

/// A node-level port: one block connection point on one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Port {
    pub direction: Direction,
    pub point: PointId,
    pub node: NodeId,
}

/// A node visualizing one block.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub block: BlockId,
    /// Top-left corner in world units.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Outputs first, then inputs, each in declaration order.
    pub ports: SmallVec<[Port; 4]>,
    /// Incident links in creation order.
    pub links: SmallVec<[LinkId; 4]>,
}

impl Node {
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn port_for_point(&self, point: PointId) -> Option<&Port> {
        self.ports.iter().find(|p| p.point == point)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Port> {
        self.ports
            .iter()
            .filter(|p| p.direction == Direction::Output)
    }
}

/// A committed connection, always stored Output → Input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub id: LinkId,
    pub port_a: PointId,
    pub node_a: NodeId,
    pub port_b: PointId,
    pub node_b: NodeId,
}

impl Link {
    /// True when this link joins `a` and `b`, in either orientation.
    pub fn joins(&self, a: PointId, b: PointId) -> bool {
        (self.port_a == a && self.port_b == b) || (self.port_a == b && self.port_b == a)
    }

    pub fn touches(&self, point: PointId) -> bool {
        self.port_a == point || self.port_b == point
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphModel {
    nodes: Vec<Node>,
    links: Vec<Link>,
    next_link: u32,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.iter().find(|l| l.id == id)
    }

    /// First node wrapping `block`.
    pub fn find_node_for_block(&self, block: BlockId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.block == block)
    }

    /// Wrap `block` in a new node and register it.
    pub fn append_node(&mut self, block: BlockId, blocks: &impl BlockLayer) -> NodeId {
        let prefix = blocks.class_name(block).unwrap_or("Node");
        let id = NodeId::with_prefix(prefix);

        let ports = [Direction::Output, Direction::Input]
            .into_iter()
            .flat_map(|dir| blocks.points(block, dir))
            .map(|point| Port {
                direction: point.direction,
                point,
                node: id,
            })
            .collect();

        self.nodes.push(Node {
            id,
            block,
            x: 0.0,
            y: 0.0,
            width: DEFAULT_NODE_SIZE.width,
            height: DEFAULT_NODE_SIZE.height,
            ports,
            links: SmallVec::new(),
        });
        id
    }

    /// Dispose every incident link of `id`, then drop the node.
    pub fn remove_node(&mut self, id: NodeId, blocks: &mut impl BlockLayer) -> Option<Node> {
        let pos = self.nodes.iter().position(|n| n.id == id)?;
        let incident = self.nodes[pos].links.clone();
        for link in incident {
            self.remove_link(link, blocks);
        }
        Some(self.nodes.remove(pos))
    }

    /// Dispose every node and link. Used when a new graph is loaded.
    pub fn reset(&mut self, blocks: &mut impl BlockLayer) {
        for link in self.links.drain(..) {
            blocks.disconnect(link.port_a, link.port_b);
        }
        self.nodes.clear();
    }

    pub fn set_node_position(&mut self, id: NodeId, position: Point) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.x = position.x;
                node.y = position.y;
                true
            }
            None => false,
        }
    }

    pub fn set_node_size(&mut self, id: NodeId, size: Size) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.width = size.width;
                node.height = size.height;
                true
            }
            None => false,
        }
    }

    /// Materialize a node-level link between two block points.
    ///
    /// No-ops when either point has no node or port on the canvas, or when
    /// the pair is already linked in either orientation. The link is stored
    /// output first whatever the argument order. The block-level connection
    /// is the caller's business.
    pub fn connect_ports(&mut self, point_a: PointId, point_b: PointId) -> Option<LinkId> {
        let node_a = self.find_node_for_block(point_a.block)?;
        let node_b = self.find_node_for_block(point_b.block)?;
        let port_a = *node_a.port_for_point(point_a)?;
        let port_b = *node_b.port_for_point(point_b)?;
        let (port_a, port_b) = if port_a.direction == Direction::Input {
            (port_b, port_a)
        } else {
            (port_a, port_b)
        };

        if self.links.iter().any(|l| l.joins(port_a.point, port_b.point)) {
            return None;
        }

        let id = LinkId(self.next_link);
        self.next_link += 1;
        let link = Link {
            id,
            port_a: port_a.point,
            node_a: port_a.node,
            port_b: port_b.point,
            node_b: port_b.node,
        };
        self.links.push(link);

        for node_id in [link.node_a, link.node_b] {
            if let Some(node) = self.node_mut(node_id)
                && !node.links.contains(&id)
            {
                node.links.push(id);
            }
        }
        Some(id)
    }

    /// Remove a link from the collection (if present) and dispose it:
    /// detach it from both nodes and sever the block-level connection.
    pub fn remove_link(&mut self, id: LinkId, blocks: &mut impl BlockLayer) -> Option<Link> {
        let pos = self.links.iter().position(|l| l.id == id)?;
        let link = self.links.remove(pos);

        for node_id in [link.node_a, link.node_b] {
            if let Some(node) = self.node_mut(node_id) {
                node.links.retain(|l| *l != id);
            }
        }
        blocks.disconnect(link.port_a, link.port_b);
        Some(link)
    }

    /// Links on `node` that touch `point`.
    pub fn links_for_point(&self, node: NodeId, point: PointId) -> Vec<LinkId> {
        let Some(node) = self.node(node) else {
            return Vec::new();
        };
        node.links
            .iter()
            .filter_map(|id| self.link(*id))
            .filter(|l| l.touches(point))
            .map(|l| l.id)
            .collect()
    }

    /// Bottom-right corner of the union of all node bounds, measured from
    /// the world origin. `Size::ZERO` for an empty graph.
    pub fn content_extent(&self) -> Size {
        self.nodes.iter().fold(Size::ZERO, |acc, n| {
            let b = n.bounds();
            Size::new(acc.width.max(b.x1), acc.height.max(b.y1))
        })
    }
}
