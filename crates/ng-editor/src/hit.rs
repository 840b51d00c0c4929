//! Hit testing: world point → port lookup.
//!
//! The presentation layer registers each port's hit region (in world
//! coordinates) as it lays nodes out; the controller queries the table on
//! pointer-down and while a candidate link is being dragged.

use ng_core::{NodeId, Point, PointId, Rect};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortHit {
    pub point: PointId,
    pub node: NodeId,
    pub rect: Rect,
}

#[derive(Debug, Clone, Default)]
pub struct HitTable {
    /// Insertion order; later entries are painted on top.
    entries: Vec<PortHit>,
}

impl HitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the hit region of `point`.
    pub fn insert(&mut self, point: PointId, node: NodeId, rect: Rect) {
        self.entries.retain(|e| e.point != point);
        self.entries.push(PortHit { point, node, rect });
    }

    pub fn remove_point(&mut self, point: PointId) {
        self.entries.retain(|e| e.point != point);
    }

    /// Drop every region belonging to `node`.
    pub fn remove_node(&mut self, node: NodeId) {
        self.entries.retain(|e| e.node != node);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, point: PointId) -> Option<&PortHit> {
        self.entries.iter().find(|e| e.point == point)
    }

    /// Topmost port whose region contains `world`.
    pub fn port_at(&self, world: Point) -> Option<&PortHit> {
        self.entries.iter().rev().find(|e| e.rect.contains(world))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
