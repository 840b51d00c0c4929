//! Drag-to-connect: the candidate link state machine.
//!
//! ```text
//! Idle ──begin──▶ Dragging ──resolve──▶ Committed | Discarded ──▶ Idle
//! ```
//!
//! Resolution validates first and mutates last: every rejection path returns
//! before the graph model or the block layer is touched, so a rejected drop
//! leaves both exactly as they were.

use crate::events::CanvasEvents;
use ng_core::{
    BlockId, BlockLayer, CanvasConfig, Compatibility, Direction, GraphModel, LinkId, NodeId,
    Point, PointId,
};

/// Why a candidate link was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    #[error("output dropped with no target port")]
    NoTarget,
    #[error("connection point has no node on the canvas")]
    Unresolved,
    #[error("points are already connected")]
    AlreadyConnected,
    #[error("cannot connect a point to itself")]
    SelfConnection,
    #[error("both points have the same direction")]
    SameDirection,
    #[error("block layer could not create a value source")]
    StubUnavailable,
    #[error("Cannot connect two different connection types")]
    TypeIncompatible,
    #[error(
        "Source block can only work in fragment shader whereas destination block is currently aimed for the vertex shader"
    )]
    TargetIncompatible,
}

impl ConnectError {
    /// Rejections the user should hear about. Everything else is a normal
    /// outcome of an ambiguous gesture.
    pub fn is_user_visible(self) -> bool {
        matches!(
            self,
            ConnectError::TypeIncompatible | ConnectError::TargetIncompatible
        )
    }

    fn from_verdict(verdict: Compatibility) -> Option<Self> {
        match verdict {
            Compatibility::Compatible => None,
            Compatibility::TypeIncompatible => Some(ConnectError::TypeIncompatible),
            Compatibility::TargetIncompatible => Some(ConnectError::TargetIncompatible),
        }
    }
}

/// The in-progress link preview: fixed at `anchor`, free end following the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateLink {
    pub anchor: PointId,
    pub anchor_node: NodeId,
    /// Free end in screen coordinates, once the pointer has moved.
    pub screen: Option<Point>,
    /// Free end in world coordinates; also the drop point.
    pub world: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Committed {
        link: LinkId,
        /// Value-source node created for an input dropped on empty canvas.
        stub: Option<NodeId>,
    },
    Discarded(ConnectError),
}

impl Resolution {
    pub fn link(&self) -> Option<LinkId> {
        match self {
            Resolution::Committed { link, .. } => Some(*link),
            Resolution::Discarded(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionResolver {
    candidate: Option<CandidateLink>,
    hovered: Option<PointId>,
}

/// A stub value source waiting to be placed if the connection commits.
struct Stub {
    block: BlockId,
    position: Point,
}

/// A fully validated connection, ready to commit.
struct Plan {
    from: PointId,
    to: PointId,
    to_node: NodeId,
    stub: Option<Stub>,
}

impl ConnectionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.candidate.is_some()
    }

    pub fn candidate(&self) -> Option<&CandidateLink> {
        self.candidate.as_ref()
    }

    pub fn hovered(&self) -> Option<PointId> {
        self.hovered
    }

    /// Start dragging from `anchor`. Ignored while a candidate already exists.
    pub fn begin(&mut self, anchor: PointId, anchor_node: NodeId, world: Point) -> bool {
        if self.candidate.is_some() {
            return false;
        }
        log::trace!("candidate link from {anchor} on {anchor_node}");
        self.candidate = Some(CandidateLink {
            anchor,
            anchor_node,
            screen: None,
            world,
        });
        true
    }

    /// Move the free end.
    pub fn update(&mut self, screen: Point, world: Point) {
        if let Some(candidate) = &mut self.candidate {
            candidate.screen = Some(screen);
            candidate.world = world;
        }
    }

    /// Returns whether the hovered port changed.
    pub fn set_hovered(&mut self, port: Option<PointId>) -> bool {
        if self.hovered == port {
            return false;
        }
        self.hovered = port;
        true
    }

    /// Drop the candidate without resolving it.
    pub fn cancel(&mut self) {
        self.candidate = None;
        self.hovered = None;
    }

    /// Resolve the candidate on pointer-up and return to idle.
    /// `None` when no candidate was being dragged.
    pub fn resolve(
        &mut self,
        model: &mut GraphModel,
        blocks: &mut impl BlockLayer,
        config: &CanvasConfig,
        events: &mut CanvasEvents,
    ) -> Option<Resolution> {
        let candidate = self.candidate.take()?;
        let hovered = self.hovered.take();

        let plan = match plan(&candidate, hovered, model, blocks, config) {
            Ok(plan) => plan,
            Err(err) => {
                log::debug!("discarded candidate from {}: {err}", candidate.anchor);
                if err.is_user_visible() {
                    events.error_message.notify(&err.to_string());
                }
                return Some(Resolution::Discarded(err));
            }
        };

        Some(commit(plan, model, blocks, config, events))
    }
}

fn plan(
    candidate: &CandidateLink,
    hovered: Option<PointId>,
    model: &GraphModel,
    blocks: &mut impl BlockLayer,
    config: &CanvasConfig,
) -> Result<Plan, ConnectError> {
    let anchor = candidate.anchor;

    let (other, stub) = match hovered {
        Some(port) => (port, None),
        None => {
            if anchor.direction == Direction::Output {
                return Err(ConnectError::NoTarget);
            }
            let value_type = blocks.point_type(anchor).ok_or(ConnectError::Unresolved)?;
            let block = blocks
                .create_value_source(value_type)
                .ok_or(ConnectError::StubUnavailable)?;
            let Some(output) = blocks.points(block, Direction::Output).first().copied() else {
                blocks.discard_block(block);
                return Err(ConnectError::StubUnavailable);
            };
            let (dx, dy) = config.stub_offset;
            let position = Point::new(candidate.world.x + dx, candidate.world.y + dy);
            (output, Some(Stub { block, position }))
        }
    };

    let checked = check(anchor, other, stub.is_some(), model, &*blocks);
    match checked {
        Ok((from, to, to_node)) => Ok(Plan {
            from,
            to,
            to_node,
            stub,
        }),
        Err(err) => {
            if let Some(stub) = stub {
                blocks.discard_block(stub.block);
            }
            Err(err)
        }
    }
}

/// Direction normalization plus every rejection check, in order.
/// Returns `(output, input, input's node)`.
fn check(
    anchor: PointId,
    other: PointId,
    other_is_stub: bool,
    model: &GraphModel,
    blocks: &impl BlockLayer,
) -> Result<(PointId, PointId, NodeId), ConnectError> {
    let (mut a, mut b) = (anchor, other);
    if a.direction == Direction::Input {
        std::mem::swap(&mut a, &mut b);
    }

    if blocks.connected_point(b) == Some(a) || model.links().iter().any(|l| l.joins(a, b)) {
        return Err(ConnectError::AlreadyConnected);
    }
    if a == b {
        return Err(ConnectError::SelfConnection);
    }
    if a.direction == b.direction {
        return Err(ConnectError::SameDirection);
    }

    // Both ends must be on the canvas, except a stub source that is placed on commit.
    let on_canvas = |point: PointId| {
        model
            .find_node_for_block(point.block)
            .filter(|n| n.port_for_point(point).is_some())
            .map(|n| n.id)
    };
    let to_node = on_canvas(b).ok_or(ConnectError::Unresolved)?;
    if !(other_is_stub && a == other) {
        on_canvas(a).ok_or(ConnectError::Unresolved)?;
    }

    if let Some(err) = ConnectError::from_verdict(blocks.check_compatibility(a, b)) {
        return Err(err);
    }
    Ok((a, b, to_node))
}

fn commit(
    plan: Plan,
    model: &mut GraphModel,
    blocks: &mut impl BlockLayer,
    config: &CanvasConfig,
    events: &mut CanvasEvents,
) -> Resolution {
    let Plan {
        from,
        to,
        to_node,
        stub,
    } = plan;

    let stub_node = stub.map(|stub| {
        let id = model.append_node(stub.block, &*blocks);
        model.set_node_position(id, stub.position);
        id
    });

    // Aliased inputs on the terminal block are mutually exclusive.
    if blocks.class_name(to.block) == Some(config.terminal_block_class.as_str())
        && let Some(sibling) = blocks
            .point_name(to)
            .and_then(|name| config.exclusive_sibling(name))
            .and_then(|name| blocks.find_point(to.block, Direction::Input, name))
    {
        log::trace!("{to} supersedes aliased input {sibling}");
        dispose_incoming(sibling, to_node, model, blocks);
    }

    // Canvas links and block-level feeds can drift apart; clear both.
    dispose_incoming(to, to_node, model, blocks);

    let Some(link) = model.connect_ports(from, to) else {
        log::warn!("no canvas link for validated {from} -> {to}");
        return Resolution::Discarded(ConnectError::Unresolved);
    };
    blocks.connect(from, to);
    log::debug!("committed {link}: {from} -> {to}");

    events.node_refresh.notify(&to_node);
    events.rebuild_required.notify(&());

    Resolution::Committed {
        link,
        stub: stub_node,
    }
}

/// Dispose every link arriving at `input`, canvas and block level alike.
fn dispose_incoming(
    input: PointId,
    node: NodeId,
    model: &mut GraphModel,
    blocks: &mut impl BlockLayer,
) {
    for link in model.links_for_point(node, input) {
        model.remove_link(link, blocks);
    }
    if let Some(source) = blocks.connected_point(input) {
        blocks.disconnect(source, input);
    }
}
