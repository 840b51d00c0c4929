//! In-memory [`BlockLayer`] implementation.
//!
//! Suitable for headless hosts and tests. Each block declares typed, named
//! inputs and outputs plus the execution stage it is restricted to; each
//! input stores the output feeding it.

use crate::block::*;
use std::collections::BTreeMap;

/// Execution stage a block is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    #[default]
    Neutral,
    Vertex,
    Fragment,
}

/// A declared connection point.
#[derive(Debug, Clone)]
pub struct PointDecl {
    pub name: String,
    pub value_type: ValueType,
}

/// Declaration of a block: class, stage, and connection points.
#[derive(Debug, Clone)]
pub struct BlockDecl {
    pub class_name: String,
    pub target: Target,
    pub inputs: Vec<PointDecl>,
    pub outputs: Vec<PointDecl>,
}

impl BlockDecl {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            target: Target::Neutral,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn input(mut self, name: &str, value_type: ValueType) -> Self {
        self.inputs.push(PointDecl {
            name: name.to_string(),
            value_type,
        });
        self
    }

    pub fn output(mut self, name: &str, value_type: ValueType) -> Self {
        self.outputs.push(PointDecl {
            name: name.to_string(),
            value_type,
        });
        self
    }
}

#[derive(Debug, Clone)]
struct BlockEntry {
    decl: BlockDecl,
    /// One slot per input: the output currently feeding it.
    feeds: Vec<Option<PointId>>,
}

/// Class name used for blocks made by [`BlockLayer::create_value_source`].
pub const VALUE_SOURCE_CLASS: &str = "InputBlock";

#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    blocks: BTreeMap<BlockId, BlockEntry>,
    next_id: u64,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a block, returning its id.
    pub fn add(&mut self, decl: BlockDecl) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        let feeds = vec![None; decl.inputs.len()];
        self.blocks.insert(id, BlockEntry { decl, feeds });
        id
    }

    pub fn contains(&self, block: BlockId) -> bool {
        self.blocks.contains_key(&block)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn target(&self, block: BlockId) -> Option<Target> {
        self.blocks.get(&block).map(|b| b.decl.target)
    }

    fn decl_of(&self, point: PointId) -> Option<&PointDecl> {
        let entry = self.blocks.get(&point.block)?;
        let list = match point.direction {
            Direction::Input => &entry.decl.inputs,
            Direction::Output => &entry.decl.outputs,
        };
        list.get(point.index as usize)
    }

    fn feed_slot(&mut self, input: PointId) -> Option<&mut Option<PointId>> {
        if input.direction != Direction::Input {
            return None;
        }
        self.blocks
            .get_mut(&input.block)?
            .feeds
            .get_mut(input.index as usize)
    }
}

impl BlockLayer for BlockRegistry {
    fn class_name(&self, block: BlockId) -> Option<&str> {
        self.blocks.get(&block).map(|b| b.decl.class_name.as_str())
    }

    fn points(&self, block: BlockId, direction: Direction) -> Vec<PointId> {
        let Some(entry) = self.blocks.get(&block) else {
            return Vec::new();
        };
        let count = match direction {
            Direction::Input => entry.decl.inputs.len(),
            Direction::Output => entry.decl.outputs.len(),
        };
        (0..count)
            .map(|i| PointId {
                block,
                direction,
                index: i as u16,
            })
            .collect()
    }

    fn point_name(&self, point: PointId) -> Option<&str> {
        self.decl_of(point).map(|d| d.name.as_str())
    }

    fn point_type(&self, point: PointId) -> Option<ValueType> {
        self.decl_of(point).map(|d| d.value_type)
    }

    fn connected_point(&self, input: PointId) -> Option<PointId> {
        if input.direction != Direction::Input {
            return None;
        }
        self.blocks
            .get(&input.block)?
            .feeds
            .get(input.index as usize)
            .copied()
            .flatten()
    }

    fn endpoints(&self, output: PointId) -> Vec<PointId> {
        if output.direction != Direction::Output {
            return Vec::new();
        }
        let mut found = Vec::new();
        for (&block, entry) in &self.blocks {
            for (i, feed) in entry.feeds.iter().enumerate() {
                if *feed == Some(output) {
                    found.push(PointId::input(block, i as u16));
                }
            }
        }
        found
    }

    fn check_compatibility(&self, from: PointId, to: PointId) -> Compatibility {
        let (Some(src), Some(dst)) = (self.decl_of(from), self.decl_of(to)) else {
            return Compatibility::TypeIncompatible;
        };
        let types_match = src.value_type == dst.value_type
            || src.value_type == ValueType::AutoDetect
            || dst.value_type == ValueType::AutoDetect;
        if !types_match {
            return Compatibility::TypeIncompatible;
        }

        let src_target = self.target(from.block).unwrap_or_default();
        let dst_target = self.target(to.block).unwrap_or_default();
        if src_target == Target::Fragment && dst_target == Target::Vertex {
            return Compatibility::TargetIncompatible;
        }

        Compatibility::Compatible
    }

    fn connect(&mut self, from: PointId, to: PointId) {
        if from.direction != Direction::Output {
            log::warn!("connect: {from} is not an output, ignoring");
            return;
        }
        match self.feed_slot(to) {
            Some(slot) => *slot = Some(from),
            None => log::warn!("connect: {to} is not a known input, ignoring"),
        }
    }

    fn disconnect(&mut self, from: PointId, to: PointId) {
        if let Some(slot) = self.feed_slot(to)
            && *slot == Some(from)
        {
            *slot = None;
        }
    }

    fn create_value_source(&mut self, value_type: ValueType) -> Option<BlockId> {
        Some(self.add(BlockDecl::new(VALUE_SOURCE_CLASS).output("output", value_type)))
    }

    fn discard_block(&mut self, block: BlockId) {
        if self.blocks.remove(&block).is_none() {
            return;
        }
        for entry in self.blocks.values_mut() {
            for feed in &mut entry.feeds {
                if feed.is_some_and(|p| p.block == block) {
                    *feed = None;
                }
            }
        }
    }
}
