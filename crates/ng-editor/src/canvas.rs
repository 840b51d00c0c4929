//! The canvas controller.
//!
//! `GraphCanvas` owns the graph model, viewport, selection and the candidate
//! link resolver, and turns normalized device events into transitions on
//! them. It draws nothing: the presentation layer subscribes to
//! [`CanvasEvents`] and keeps the [`HitTable`] current.
//!
//! ## Gestures
//!
//! | Pointer-down on | Move with | Effect |
//! |-----------------|-----------|--------|
//! | a port | any | drag a candidate link; resolved on pointer-up |
//! | empty canvas | Alt + primary | vertical drag zooms |
//! | empty canvas | otherwise | drag pans |

use crate::connect::{ConnectionResolver, Resolution};
use crate::events::CanvasEvents;
use crate::hit::HitTable;
use crate::input::{Buttons, InputEvent, ModifierState, Modifiers, PointerId};
use crate::selection::{Selection, SelectionTarget};
use ng_core::layout::{self, LayeredLayout, LayoutEngine};
use ng_core::{
    BlockId, BlockLayer, CanvasConfig, DragZoom, GRID_SIZE_KEY, GraphModel, Link, LinkId, Node,
    NodeId, Point, PointId, Settings, Size, Viewport, grid_snap,
};

/// Pointer cursor requested from the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Cursor {
    #[default]
    Default,
    Move,
}

/// Host services the controller needs while handling a gesture.
pub trait Surface {
    /// Keep routing this pointer's events to the canvas until released,
    /// even outside its bounds.
    fn set_pointer_capture(&mut self, pointer: PointerId);

    fn release_pointer_capture(&mut self, pointer: PointerId);

    /// Current on-screen size of the canvas element.
    fn size(&self) -> Size;

    fn set_cursor(&mut self, _cursor: Cursor) {}
}

#[derive(Debug)]
pub struct GraphCanvas<B: BlockLayer> {
    blocks: B,
    model: GraphModel,
    viewport: Viewport,
    drag_zoom: DragZoom,
    selection: Selection,
    resolver: ConnectionResolver,
    hits: HitTable,
    modifiers: ModifierState,
    /// Screen position of the last pan step; `Some` while panning.
    pan_start: Option<Point>,
    grid_size: f64,
    config: CanvasConfig,
    events: CanvasEvents,
}

impl<B: BlockLayer> GraphCanvas<B> {
    /// The grid size comes from `settings`, falling back to the configured one.
    pub fn new(blocks: B, config: CanvasConfig, settings: &dyn Settings) -> Self {
        let grid_size = settings.read_number(GRID_SIZE_KEY, config.grid_size);
        Self {
            blocks,
            model: GraphModel::new(),
            viewport: Viewport::with_limits(config.min_zoom, config.max_zoom, config.wheel_step),
            drag_zoom: DragZoom::new(config.drag_zoom),
            selection: Selection::default(),
            resolver: ConnectionResolver::new(),
            hits: HitTable::new(),
            modifiers: ModifierState::default(),
            pan_start: None,
            grid_size,
            config,
            events: CanvasEvents::new(),
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn blocks(&self) -> &B {
        &self.blocks
    }

    /// Direct block access for the host. Changes made here bypass the canvas;
    /// call [`GraphCanvas::connect_ports`] to mirror new connections.
    pub fn blocks_mut(&mut self) -> &mut B {
        &mut self.blocks
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn resolver(&self) -> &ConnectionResolver {
        &self.resolver
    }

    pub fn hits(&self) -> &HitTable {
        &self.hits
    }

    /// Port hit regions, maintained by the presentation layer.
    pub fn hits_mut(&mut self) -> &mut HitTable {
        &mut self.hits
    }

    pub fn events(&self) -> &CanvasEvents {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut CanvasEvents {
        &mut self.events
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Modifier snapshot tracked from key events.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers.snapshot()
    }

    // ─── Grid ────────────────────────────────────────────────────────────

    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    pub fn set_grid_size(&mut self, size: f64) {
        if size == self.grid_size {
            return;
        }
        self.grid_size = size;
        self.events.grid_size_changed.notify(&size);
    }

    /// Re-read the persisted grid size after an external change.
    ///
    /// The canvas holds no watch on the store. Hosts register one with
    /// [`Settings::on_change`] for [`GRID_SIZE_KEY`] and call this when it fires.
    pub fn grid_size_changed(&mut self, settings: &dyn Settings) {
        let size = settings.read_number(GRID_SIZE_KEY, self.config.grid_size);
        self.set_grid_size(size);
    }

    pub fn grid_position(&self, value: f64) -> f64 {
        grid_snap(value, self.grid_size)
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.viewport.pan(dx, dy);
        self.transform_changed();
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        if self.viewport.set_zoom(zoom) {
            self.transform_changed();
        }
    }

    pub fn zoom_to_fit(&mut self, surface: &impl Surface) {
        self.viewport
            .zoom_to_fit(self.model.content_extent(), surface.size());
        self.transform_changed();
    }

    fn transform_changed(&mut self) {
        let transform = self.viewport.transform();
        self.events.transform_changed.notify(&transform);
    }

    // ─── Device input ────────────────────────────────────────────────────

    /// Dispatch a device event. Gesture handlers receive the tracked
    /// modifier snapshot.
    pub fn handle(&mut self, event: &InputEvent, surface: &mut impl Surface) {
        match *event {
            InputEvent::PointerDown {
                x, y, pointer_id, ..
            } => self.pointer_down(Point::new(x, y), pointer_id, surface),
            InputEvent::PointerMove { x, y, buttons, .. } => {
                let modifiers = self.modifiers.snapshot();
                self.pointer_move(Point::new(x, y), buttons, modifiers, surface);
            }
            InputEvent::PointerUp { x, y, pointer_id } => {
                self.pointer_up(Point::new(x, y), pointer_id, surface);
            }
            InputEvent::Wheel { x, y, delta_y } => self.wheel(Point::new(x, y), delta_y, &*surface),
            InputEvent::KeyDown { modifiers } => self.key_down(modifiers),
            InputEvent::KeyUp => self.key_up(),
            InputEvent::Blur => self.blur(),
        }
    }

    pub fn pointer_down(&mut self, position: Point, pointer: PointerId, surface: &mut impl Surface) {
        surface.set_pointer_capture(pointer);

        let world = self.viewport.screen_to_world(position);
        if let Some(hit) = self.hits.port_at(world).copied() {
            self.resolver.begin(hit.point, hit.node, world);
            return;
        }

        self.select(None, Modifiers::NONE);
        self.pan_start = Some(position);
    }

    pub fn pointer_move(
        &mut self,
        position: Point,
        buttons: Buttons,
        modifiers: Modifiers,
        surface: &mut impl Surface,
    ) {
        if self.resolver.is_dragging() {
            let world = self.viewport.screen_to_world(position);
            let hovered = self.hits.port_at(world).map(|hit| hit.point);
            if self.resolver.set_hovered(hovered) {
                self.events.candidate_port_hovered.notify(&hovered);
            }
            self.events.candidate_link_moved.notify(&Some(position));
            self.resolver.update(position, world);
            return;
        }

        if modifiers.alt && buttons.is_primary_only() {
            if let Some(delta) = self.drag_zoom.update(position.y) {
                self.set_zoom(self.viewport.zoom() + delta);
            }
            return;
        }

        surface.set_cursor(Cursor::Move);
        let Some(start) = self.pan_start else {
            return;
        };
        self.pan(position.x - start.x, position.y - start.y);
        self.pan_start = Some(position);
    }

    /// Ends any gesture. Returns how a dragged candidate link resolved.
    pub fn pointer_up(
        &mut self,
        _position: Point,
        pointer: PointerId,
        surface: &mut impl Surface,
    ) -> Option<Resolution> {
        self.pan_start = None;
        surface.release_pointer_capture(pointer);
        self.drag_zoom.reset();

        let was_hovering = self.resolver.hovered().is_some();
        let resolution = self.resolver.resolve(
            &mut self.model,
            &mut self.blocks,
            &self.config,
            &mut self.events,
        )?;
        self.events.candidate_link_moved.notify(&None);
        if was_hovering {
            self.events.candidate_port_hovered.notify(&None);
        }

        // A superseded link may have been the selected one.
        if let Some(link) = self.selection.link()
            && self.model.link(link).is_none()
        {
            self.selection.forget_link(link);
            self.selection_changed();
        }
        Some(resolution)
    }

    pub fn wheel(&mut self, position: Point, delta_y: f64, surface: &impl Surface) {
        let before = self.viewport.transform();
        self.viewport.wheel_zoom(delta_y, position, surface.size());
        if self.viewport.transform() != before {
            self.transform_changed();
        }
    }

    pub fn key_down(&mut self, modifiers: Modifiers) {
        self.modifiers.key_down(modifiers);
    }

    pub fn key_up(&mut self) {
        self.modifiers.clear();
        self.drag_zoom.reset();
    }

    pub fn blur(&mut self) {
        self.modifiers.clear();
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Select a node or link, or clear with `None`. Ctrl makes node
    /// selection additive.
    pub fn select(&mut self, target: Option<SelectionTarget>, modifiers: Modifiers) {
        match target {
            None => self.selection.clear(),
            Some(SelectionTarget::Node(id)) => self.selection.select_node(id, modifiers.ctrl),
            Some(SelectionTarget::Link(id)) => self.selection.select_link(id),
        }
        self.selection_changed();
    }

    fn selection_changed(&mut self) {
        let selection = self.selection.clone();
        self.events.selection_changed.notify(&selection);
    }

    // ─── Graph ───────────────────────────────────────────────────────────

    pub fn append_block(&mut self, block: BlockId) -> NodeId {
        self.model.append_node(block, &self.blocks)
    }

    /// Move a node so its top-left corner lands on the grid line nearest `position`.
    pub fn move_node(&mut self, id: NodeId, position: Point) -> bool {
        let snapped = Point::new(self.grid_position(position.x), self.grid_position(position.y));
        self.model.set_node_position(id, snapped)
    }

    /// Record a node's measured size.
    pub fn set_node_size(&mut self, id: NodeId, size: Size) -> bool {
        self.model.set_node_size(id, size)
    }

    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let incident: Vec<LinkId> = self.model.node(id)?.links.to_vec();
        let node = self.model.remove_node(id, &mut self.blocks)?;
        self.hits.remove_node(id);

        let mut changed = self.selection.forget_node(id);
        for link in incident {
            changed |= self.selection.forget_link(link);
        }
        if changed {
            self.selection_changed();
        }
        self.events.rebuild_required.notify(&());
        Some(node)
    }

    pub fn remove_link(&mut self, id: LinkId) -> Option<Link> {
        let link = self.model.remove_link(id, &mut self.blocks)?;
        if self.selection.forget_link(id) {
            self.selection_changed();
        }
        self.events.rebuild_required.notify(&());
        Some(link)
    }

    /// Mirror an existing block-level connection on the canvas.
    pub fn connect_ports(&mut self, point_a: PointId, point_b: PointId) -> Option<LinkId> {
        self.model.connect_ports(point_a, point_b)
    }

    pub fn find_node_for_block(&self, block: BlockId) -> Option<&Node> {
        self.model.find_node_for_block(block)
    }

    /// Drop every node and link, e.g. before loading another graph.
    pub fn reset(&mut self) {
        self.resolver.cancel();
        self.pan_start = None;
        self.model.reset(&mut self.blocks);
        self.hits.clear();
        if !self.selection.is_empty() {
            self.selection.clear();
            self.selection_changed();
        }
    }

    /// Lay the graph out with the built-in layered engine.
    pub fn distribute_graph(&mut self) -> usize {
        self.distribute_graph_with(&LayeredLayout::new())
    }

    /// Reset the viewport, then lay the graph out with `engine`.
    pub fn distribute_graph_with(&mut self, engine: &impl LayoutEngine) -> usize {
        self.viewport.reset();
        self.transform_changed();
        layout::distribute_graph(
            &mut self.model,
            &self.blocks,
            engine,
            &self.config.layout,
            self.grid_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ng_core::{BlockDecl, BlockRegistry, MemorySettings, Rect, ValueType};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct TestSurface {
        captured: Vec<PointerId>,
        released: Vec<PointerId>,
        cursor: Cursor,
    }

    impl Surface for TestSurface {
        fn set_pointer_capture(&mut self, pointer: PointerId) {
            self.captured.push(pointer);
        }

        fn release_pointer_capture(&mut self, pointer: PointerId) {
            self.released.push(pointer);
        }

        fn size(&self) -> Size {
            Size::new(800.0, 600.0)
        }

        fn set_cursor(&mut self, cursor: Cursor) {
            self.cursor = cursor;
        }
    }

    fn canvas() -> GraphCanvas<BlockRegistry> {
        GraphCanvas::new(
            BlockRegistry::new(),
            CanvasConfig::default(),
            &MemorySettings::new(),
        )
    }

    #[test]
    fn drag_on_empty_canvas_pans() {
        let mut c = canvas();
        let mut s = TestSurface::default();
        c.handle(&InputEvent::pointer_down(10.0, 10.0, Buttons::PRIMARY), &mut s);
        c.handle(&InputEvent::pointer_move(30.0, 5.0, Buttons::PRIMARY), &mut s);
        c.handle(&InputEvent::pointer_move(40.0, 5.0, Buttons::PRIMARY), &mut s);
        c.handle(&InputEvent::pointer_up(40.0, 5.0), &mut s);
        c.handle(&InputEvent::pointer_move(90.0, 90.0, Buttons::NONE), &mut s);

        assert_eq!(c.viewport().offset(), ng_core::Vec2::new(30.0, -5.0));
        assert_eq!(s.captured, vec![PointerId(1)]);
        assert_eq!(s.released, vec![PointerId(1)]);
        assert_eq!(s.cursor, Cursor::Move);
    }

    #[test]
    fn alt_drag_zooms_after_deadzone() {
        let mut c = canvas();
        let mut s = TestSurface::default();
        c.handle(&InputEvent::KeyDown { modifiers: Modifiers::ALT }, &mut s);
        c.handle(&InputEvent::pointer_move(0.0, 100.0, Buttons::PRIMARY), &mut s);
        c.handle(&InputEvent::pointer_move(0.0, 140.0, Buttons::PRIMARY), &mut s);
        assert_eq!(c.viewport().zoom(), 1.0);

        c.handle(&InputEvent::pointer_move(0.0, 200.0, Buttons::PRIMARY), &mut s);
        assert!((c.viewport().zoom() - 1.1).abs() < 1e-9);
        assert_eq!(c.viewport().offset(), ng_core::Vec2::ZERO);
    }

    #[test]
    fn alt_drag_zoom_stays_clamped() {
        let mut c = canvas();
        let mut s = TestSurface::default();
        c.key_down(Modifiers::ALT);
        for step in 0..200 {
            let y = -(step as f64) * 1000.0;
            c.pointer_move(Point::new(0.0, y), Buttons::PRIMARY, c.modifiers(), &mut s);
        }
        assert_eq!(c.viewport().zoom(), 0.1);
    }

    #[test]
    fn blur_stops_alt_drag() {
        let mut c = canvas();
        let mut s = TestSurface::default();
        c.handle(&InputEvent::KeyDown { modifiers: Modifiers::ALT }, &mut s);
        c.handle(&InputEvent::Blur, &mut s);
        c.handle(&InputEvent::pointer_move(0.0, 0.0, Buttons::PRIMARY), &mut s);
        c.handle(&InputEvent::pointer_move(0.0, 500.0, Buttons::PRIMARY), &mut s);
        assert_eq!(c.viewport().zoom(), 1.0);
        assert_eq!(c.modifiers(), Modifiers::NONE);
    }

    #[test]
    fn wheel_notifies_transform() {
        let mut c = canvas();
        let seen = Rc::new(RefCell::new(0));
        let counter = seen.clone();
        c.events_mut()
            .transform_changed
            .subscribe(move |_| *counter.borrow_mut() += 1);

        c.handle(
            &InputEvent::Wheel {
                x: 0.0,
                y: 0.0,
                delta_y: -1.0,
            },
            &mut TestSurface::default(),
        );
        assert!((c.viewport().zoom() - 1.1).abs() < 1e-9);
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn wheel_at_zoom_limit_is_silent() {
        let mut c = canvas();
        c.set_zoom(4.0);
        let seen = Rc::new(RefCell::new(0));
        let counter = seen.clone();
        c.events_mut()
            .transform_changed
            .subscribe(move |_| *counter.borrow_mut() += 1);

        c.wheel(Point::new(120.0, 80.0), -1.0, &TestSurface::default());
        assert_eq!(c.viewport().zoom(), 4.0);
        assert_eq!(*seen.borrow(), 0);
    }

    #[test]
    fn press_on_port_starts_candidate() {
        let mut c = canvas();
        let block = c
            .blocks_mut()
            .add(BlockDecl::new("ConstBlock").output("value", ValueType::Float));
        let node = c.append_block(block);
        let port = PointId::output(block, 0);
        c.hits_mut()
            .insert(port, node, Rect::new(190.0, 40.0, 210.0, 60.0));

        let mut s = TestSurface::default();
        c.handle(&InputEvent::pointer_down(200.0, 50.0, Buttons::PRIMARY), &mut s);
        assert_eq!(c.resolver().candidate().map(|k| k.anchor), Some(port));

        c.handle(&InputEvent::pointer_move(400.0, 50.0, Buttons::PRIMARY), &mut s);
        assert_eq!(c.viewport().offset(), ng_core::Vec2::ZERO);
    }

    #[test]
    fn press_on_canvas_clears_selection() {
        let mut c = canvas();
        let block = c.blocks_mut().add(BlockDecl::new("ConstBlock"));
        let node = c.append_block(block);
        c.select(Some(SelectionTarget::Node(node)), Modifiers::NONE);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        c.events_mut()
            .selection_changed
            .subscribe(move |s: &Selection| sink.borrow_mut().push(s.clone()));

        c.handle(
            &InputEvent::pointer_down(5.0, 5.0, Buttons::PRIMARY),
            &mut TestSurface::default(),
        );
        assert!(c.selection().is_empty());
        assert_eq!(*seen.borrow(), vec![Selection::None]);
    }

    #[test]
    fn ctrl_makes_selection_additive() {
        let mut c = canvas();
        let a = c.blocks_mut().add(BlockDecl::new("A"));
        let b = c.blocks_mut().add(BlockDecl::new("B"));
        let na = c.append_block(a);
        let nb = c.append_block(b);

        c.key_down(Modifiers::CTRL);
        c.select(Some(SelectionTarget::Node(na)), c.modifiers());
        c.select(Some(SelectionTarget::Node(nb)), c.modifiers());
        assert_eq!(c.selection().nodes(), &[na, nb]);

        c.key_up();
        c.select(Some(SelectionTarget::Node(na)), c.modifiers());
        assert_eq!(c.selection().nodes(), &[na]);
    }

    #[test]
    fn grid_size_follows_settings() {
        let mut settings = MemorySettings::new();
        settings.write_number(GRID_SIZE_KEY, 10.0).unwrap();
        let mut c = GraphCanvas::new(BlockRegistry::new(), CanvasConfig::default(), &settings);
        assert_eq!(c.grid_size(), 10.0);
        assert_eq!(c.grid_position(14.0), 10.0);

        settings.write_number(GRID_SIZE_KEY, 0.0).unwrap();
        c.grid_size_changed(&settings);
        assert_eq!(c.grid_size(), 0.0);
        assert_eq!(c.grid_position(14.0), 14.0);
    }

    #[test]
    fn grid_size_watch_drives_refresh() {
        let mut settings = MemorySettings::new();
        let mut c = GraphCanvas::new(BlockRegistry::new(), CanvasConfig::default(), &settings);
        let dirty = Rc::new(std::cell::Cell::new(false));
        let flag = dirty.clone();
        let watch = settings.on_change(GRID_SIZE_KEY, Box::new(move |_| flag.set(true)));
        let sizes = Rc::new(RefCell::new(Vec::new()));
        let sink = sizes.clone();
        c.events_mut()
            .grid_size_changed
            .subscribe(move |s: &f64| sink.borrow_mut().push(*s));

        settings.write_number(GRID_SIZE_KEY, 16.0).unwrap();
        if dirty.replace(false) {
            c.grid_size_changed(&settings);
        }
        assert_eq!(c.grid_size(), 16.0);

        assert!(settings.remove_watch(GRID_SIZE_KEY, watch));
        settings.write_number(GRID_SIZE_KEY, 8.0).unwrap();
        assert!(!dirty.get());
        assert_eq!(*sizes.borrow(), vec![16.0]);
    }

    #[test]
    fn move_node_snaps_to_grid() {
        let mut c = canvas();
        let block = c.blocks_mut().add(BlockDecl::new("A"));
        let node = c.append_block(block);
        assert!(c.move_node(node, Point::new(31.0, 49.0)));
        let n = c.model().node(node).unwrap();
        assert_eq!((n.x, n.y), (40.0, 40.0));
    }

    #[test]
    fn removing_selected_link_clears_selection() {
        let mut c = canvas();
        let a = c
            .blocks_mut()
            .add(BlockDecl::new("A").output("out", ValueType::Float));
        let b = c
            .blocks_mut()
            .add(BlockDecl::new("B").input("in", ValueType::Float));
        c.append_block(a);
        c.append_block(b);
        let (out, input) = (PointId::output(a, 0), PointId::input(b, 0));
        c.blocks_mut().connect(out, input);
        let link = c.connect_ports(out, input).unwrap();

        c.select(Some(SelectionTarget::Link(link)), Modifiers::NONE);
        assert!(c.remove_link(link).is_some());
        assert!(c.selection().is_empty());
        assert!(!c.blocks().is_connected(input));
    }
}
