//! The block layer seam.
//!
//! Blocks are the computational units a canvas node visualizes. They are
//! owned outside the canvas; the canvas only ever talks to them through the
//! [`BlockLayer`] trait, addressing blocks by [`BlockId`] and their
//! connection points by [`PointId`]. Compatibility decisions belong to the
//! block layer, never to the canvas.

use std::fmt;

/// Stable identity of an externally-owned block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u64);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block#{}", self.0)
    }
}

/// Which way data flows through a connection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Input => Direction::Output,
            Direction::Output => Direction::Input,
        }
    }
}

/// A block-level connection point: the `index`-th input or output of `block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointId {
    pub block: BlockId,
    pub direction: Direction,
    pub index: u16,
}

impl PointId {
    pub const fn input(block: BlockId, index: u16) -> Self {
        Self {
            block,
            direction: Direction::Input,
            index,
        }
    }

    pub const fn output(block: BlockId, index: u16) -> Self {
        Self {
            block,
            direction: Direction::Output,
            index,
        }
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            Direction::Input => "in",
            Direction::Output => "out",
        };
        write!(f, "{}.{dir}{}", self.block, self.index)
    }
}

/// Data type carried by a connection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Float,
    Int,
    Vector2,
    Vector3,
    Vector4,
    Color3,
    Color4,
    Matrix,
    /// Adopts whatever type is connected to it.
    AutoDetect,
}

/// The block layer's verdict on whether two points may be linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    Compatible,
    /// The two points carry different data types.
    TypeIncompatible,
    /// The source is restricted to one execution stage, the destination to another.
    TargetIncompatible,
}

impl Compatibility {
    pub fn is_compatible(self) -> bool {
        matches!(self, Compatibility::Compatible)
    }
}

/// Everything the canvas needs from the blocks it visualizes.
pub trait BlockLayer {
    /// Class/type name of a block (e.g. `FragmentOutputBlock`).
    fn class_name(&self, block: BlockId) -> Option<&str>;

    /// Declared connection points of one direction, in declaration order.
    fn points(&self, block: BlockId, direction: Direction) -> Vec<PointId>;

    fn point_name(&self, point: PointId) -> Option<&str>;

    fn point_type(&self, point: PointId) -> Option<ValueType>;

    /// The output feeding an input point, if any.
    fn connected_point(&self, input: PointId) -> Option<PointId>;

    /// Every input fed by an output point.
    fn endpoints(&self, output: PointId) -> Vec<PointId>;

    fn is_connected(&self, point: PointId) -> bool {
        match point.direction {
            Direction::Input => self.connected_point(point).is_some(),
            Direction::Output => !self.endpoints(point).is_empty(),
        }
    }

    /// Verdict for linking output `from` to input `to`.
    fn check_compatibility(&self, from: PointId, to: PointId) -> Compatibility;

    /// Connect output `from` to input `to` at block level.
    fn connect(&mut self, from: PointId, to: PointId);

    /// Sever a block-level connection. Unknown connections are ignored.
    fn disconnect(&mut self, from: PointId, to: PointId);

    /// Create a default value-source block with a single output of `value_type`.
    fn create_value_source(&mut self, value_type: ValueType) -> Option<BlockId>;

    /// Drop a block created by the canvas that never made it onto the graph.
    fn discard_block(&mut self, block: BlockId);

    /// Look a point up by its declared name.
    fn find_point(&self, block: BlockId, direction: Direction, name: &str) -> Option<PointId> {
        self.points(block, direction)
            .into_iter()
            .find(|p| self.point_name(*p) == Some(name))
    }
}
