//! Canvas viewport: pan offset, zoom, and the screen ↔ world transform.
//!
//! Screen coordinates are relative to the canvas element's top-left corner.
//! A world point `w` appears on screen at `offset + w * zoom`.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 4.0;
pub const WHEEL_STEP: f64 = 0.1;

/// Round `value` to the nearest grid line. A zero grid disables snapping.
pub fn grid_snap(value: f64, grid: f64) -> f64 {
    if grid == 0.0 {
        return value;
    }
    grid * ((value + grid / 2.0) / grid).floor()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    offset: Vec2,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    wheel_step: f64,
    transform: Affine,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::with_limits(MIN_ZOOM, MAX_ZOOM, WHEEL_STEP)
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(min_zoom: f64, max_zoom: f64, wheel_step: f64) -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            min_zoom,
            max_zoom,
            wheel_step,
            transform: Affine::IDENTITY,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// World → screen transform: `translate(offset) * scale(zoom)`.
    pub fn transform(&self) -> Affine {
        self.transform
    }

    fn update_transform(&mut self) {
        self.transform = Affine::translate(self.offset) * Affine::scale(self.zoom);
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset += Vec2::new(dx, dy);
        self.update_transform();
    }

    pub fn set_offset(&mut self, x: f64, y: f64) {
        self.offset = Vec2::new(x, y);
        self.update_transform();
    }

    /// Clamp and apply a zoom level. Returns whether the zoom changed.
    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        let zoom = self.clamp_zoom(zoom);
        if zoom == self.zoom {
            return false;
        }
        self.zoom = zoom;
        self.update_transform();
        true
    }

    /// Zoom 1, offset (0, 0).
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.zoom = 1.0;
        self.update_transform();
    }

    /// Fit `content` into `viewport`, anchored at the world origin.
    pub fn zoom_to_fit(&mut self, content: Size, viewport: Size) {
        if content.width <= 0.0 || content.height <= 0.0 {
            log::debug!("zoom_to_fit: empty content {content:?}, ignoring");
            return;
        }
        let x_factor = viewport.width / content.width;
        let y_factor = viewport.height / content.height;
        self.zoom = self.clamp_zoom(x_factor.min(y_factor));
        self.offset = Vec2::ZERO;
        self.update_transform();
    }

    /// Step the zoom by one wheel notch, keeping the world point under
    /// `pointer` fixed on screen. `delta_y < 0` zooms in.
    pub fn wheel_zoom(&mut self, delta_y: f64, pointer: Point, viewport: Size) {
        let delta = if delta_y < 0.0 {
            self.wheel_step
        } else {
            -self.wheel_step
        };
        let old_zoom = self.zoom;
        self.set_zoom(old_zoom + delta);

        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return;
        }
        let width_diff = viewport.width * (self.zoom - old_zoom);
        let height_diff = viewport.height * (self.zoom - old_zoom);
        let x_factor = (pointer.x - self.offset.x) / old_zoom / viewport.width;
        let y_factor = (pointer.y - self.offset.y) / old_zoom / viewport.height;

        self.offset -= Vec2::new(width_diff * x_factor, height_diff * y_factor);
        self.update_transform();
    }

    pub fn screen_to_world(&self, p: Point) -> Point {
        self.transform.inverse() * p
    }

    pub fn world_to_screen(&self, p: Point) -> Point {
        self.transform * p
    }
}

/// Tuning for the alt-drag zoom gesture. The values are empirical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragZoomTuning {
    /// Pointer travel is divided by this before the deadzone test.
    pub scale: f64,
    /// Scaled travel must exceed this to produce a step.
    pub threshold: f64,
    /// Scaled travel is divided by this to become a zoom delta.
    pub rate: f64,
}

impl Default for DragZoomTuning {
    fn default() -> Self {
        Self {
            scale: 10.0,
            threshold: 5.0,
            rate: 100.0,
        }
    }
}

/// Deadzone-filtered vertical drag → zoom delta.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragZoom {
    reference_y: Option<f64>,
    tuning: DragZoomTuning,
}

impl DragZoom {
    pub fn new(tuning: DragZoomTuning) -> Self {
        Self {
            reference_y: None,
            tuning,
        }
    }

    /// Feed a pointer y. Returns a zoom delta once the pointer has left the
    /// deadzone around the reference, which then moves to `pointer_y`.
    pub fn update(&mut self, pointer_y: f64) -> Option<f64> {
        let reference = *self.reference_y.get_or_insert(pointer_y);
        let scaled = (pointer_y - reference) / self.tuning.scale;
        if scaled.abs() > self.tuning.threshold {
            self.reference_y = Some(pointer_y);
            return Some(scaled / self.tuning.rate);
        }
        None
    }

    pub fn reset(&mut self) {
        self.reference_y = None;
    }

    pub fn is_active(&self) -> bool {
        self.reference_y.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn grid_snap_rounds_to_nearest_line() {
        assert_eq!(grid_snap(29.0, 20.0), 20.0);
        assert_eq!(grid_snap(30.0, 20.0), 40.0);
        assert_eq!(grid_snap(-9.0, 20.0), 0.0);
        assert_eq!(grid_snap(-11.0, 20.0), -20.0);
    }

    #[test]
    fn grid_snap_zero_grid_is_identity() {
        assert_eq!(grid_snap(13.37, 0.0), 13.37);
    }

    #[test]
    fn grid_snap_is_idempotent() {
        for grid in [1.0, 7.5, 20.0, 64.0] {
            for i in -200..200 {
                let v = i as f64 * 1.37;
                let once = grid_snap(v, grid);
                assert_eq!(grid_snap(once, grid), once, "v={v} grid={grid}");
            }
        }
    }

    #[test]
    fn set_zoom_clamps_and_reports_change() {
        let mut vp = Viewport::new();
        assert!(vp.set_zoom(10.0));
        assert_eq!(vp.zoom(), MAX_ZOOM);
        assert!(!vp.set_zoom(12.0), "already at max");
        assert!(vp.set_zoom(0.0));
        assert_eq!(vp.zoom(), MIN_ZOOM);
    }

    #[test]
    fn zoom_to_fit_picks_tighter_axis() {
        let mut vp = Viewport::new();
        vp.pan(40.0, 40.0);
        vp.zoom_to_fit(Size::new(400.0, 300.0), Size::new(200.0, 300.0));
        assert_eq!(vp.zoom(), 0.5);
        assert_eq!(vp.offset(), Vec2::ZERO);
    }

    #[test]
    fn wheel_zoom_keeps_pointer_anchor() {
        let mut vp = Viewport::new();
        vp.set_offset(30.0, -20.0);
        let viewport = Size::new(800.0, 600.0);
        let pointer = Point::new(250.0, 140.0);
        let before = vp.screen_to_world(pointer);

        vp.wheel_zoom(-1.0, pointer, viewport);
        assert!(approx(vp.zoom(), 1.1));

        let after = vp.world_to_screen(before);
        assert!(approx(after.x, pointer.x), "x drifted to {}", after.x);
        assert!(approx(after.y, pointer.y), "y drifted to {}", after.y);
    }

    #[test]
    fn wheel_zoom_out_direction() {
        let mut vp = Viewport::new();
        vp.wheel_zoom(3.0, Point::ZERO, Size::new(100.0, 100.0));
        assert!(approx(vp.zoom(), 0.9));
    }

    #[test]
    fn wheel_zoom_stays_clamped() {
        let mut vp = Viewport::new();
        for _ in 0..100 {
            vp.wheel_zoom(-1.0, Point::new(10.0, 10.0), Size::new(100.0, 100.0));
        }
        assert_eq!(vp.zoom(), MAX_ZOOM);
        for _ in 0..100 {
            vp.wheel_zoom(1.0, Point::new(10.0, 10.0), Size::new(100.0, 100.0));
        }
        assert!(vp.zoom() >= MIN_ZOOM);
    }

    #[test]
    fn screen_world_roundtrip() {
        let mut vp = Viewport::new();
        vp.set_offset(15.0, 25.0);
        vp.set_zoom(2.0);
        let world = vp.screen_to_world(Point::new(115.0, 225.0));
        assert!(approx(world.x, 50.0));
        assert!(approx(world.y, 100.0));
    }

    #[test]
    fn drag_zoom_deadzone_then_step() {
        let mut dz = DragZoom::default();
        assert_eq!(dz.update(100.0), None, "first sample sets the reference");
        assert_eq!(dz.update(140.0), None, "4 scaled px is inside the deadzone");
        let delta = dz.update(160.0).unwrap();
        assert!(approx(delta, 0.06));
        // Reference moved to 160.
        assert_eq!(dz.update(200.0), None);
        dz.reset();
        assert!(!dz.is_active());
    }
}
