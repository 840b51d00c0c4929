//! Selection state: a set of nodes or a single link, never both.

use ng_core::{LinkId, NodeId};
use smallvec::SmallVec;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    None,
    /// Selected nodes in selection order.
    Nodes(SmallVec<[NodeId; 4]>),
    Link(LinkId),
}

/// What a selection request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionTarget {
    Node(NodeId),
    Link(LinkId),
}

impl Selection {
    /// Select a node. `additive` accumulates into an existing node set
    /// (ignoring duplicates); otherwise the node replaces the selection.
    pub fn select_node(&mut self, id: NodeId, additive: bool) {
        match self {
            Selection::Nodes(nodes) if additive => {
                if !nodes.contains(&id) {
                    nodes.push(id);
                }
            }
            _ => *self = Selection::Nodes(SmallVec::from_slice(&[id])),
        }
    }

    pub fn select_link(&mut self, id: LinkId) {
        *self = Selection::Link(id);
    }

    pub fn clear(&mut self) {
        *self = Selection::None;
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::None)
    }

    pub fn nodes(&self) -> &[NodeId] {
        match self {
            Selection::Nodes(nodes) => nodes,
            _ => &[],
        }
    }

    pub fn link(&self) -> Option<LinkId> {
        match self {
            Selection::Link(id) => Some(*id),
            _ => None,
        }
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes().contains(&id)
    }

    /// Drop a removed node. Returns whether the selection changed.
    pub fn forget_node(&mut self, id: NodeId) -> bool {
        let Selection::Nodes(nodes) = self else {
            return false;
        };
        let before = nodes.len();
        nodes.retain(|n| *n != id);
        if nodes.len() == before {
            return false;
        }
        if nodes.is_empty() {
            *self = Selection::None;
        }
        true
    }

    /// Drop a removed link. Returns whether the selection changed.
    pub fn forget_link(&mut self, id: LinkId) -> bool {
        if self.link() == Some(id) {
            *self = Selection::None;
            return true;
        }
        false
    }
}
