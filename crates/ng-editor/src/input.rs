//! Input abstraction layer.
//!
//! Normalizes host device events into a unified `InputEvent` enum consumed
//! by the canvas controller. Pointer coordinates are screen pixels relative
//! to the canvas element's top-left corner.

use ng_core::Point;

/// Modifier key snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const ALT: Self = Self {
        alt: true,
        ..Self::NONE
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };
}

/// Host pointer identifier (one per mouse / touch contact / pen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointerId(pub i32);

/// Pressed-buttons mask, as reported by pointer events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Buttons(pub u16);

impl Buttons {
    pub const NONE: Self = Self(0);
    pub const PRIMARY: Self = Self(1);
    pub const SECONDARY: Self = Self(2);
    pub const MIDDLE: Self = Self(4);

    /// Exactly the primary button, nothing else.
    pub fn is_primary_only(self) -> bool {
        self == Self::PRIMARY
    }
}

/// A normalized input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        x: f64,
        y: f64,
        pointer_id: PointerId,
        buttons: Buttons,
    },

    PointerMove {
        x: f64,
        y: f64,
        pointer_id: PointerId,
        buttons: Buttons,
    },

    PointerUp {
        x: f64,
        y: f64,
        pointer_id: PointerId,
    },

    /// Mouse wheel. Only the sign of `delta_y` matters; negative zooms in.
    Wheel { x: f64, y: f64, delta_y: f64 },

    /// A key went down; carries the modifier state reported with it.
    KeyDown { modifiers: Modifiers },

    KeyUp,

    /// The host window lost focus.
    Blur,
}

impl InputEvent {
    pub fn pointer_down(x: f64, y: f64, buttons: Buttons) -> Self {
        Self::PointerDown {
            x,
            y,
            pointer_id: PointerId(1),
            buttons,
        }
    }

    pub fn pointer_move(x: f64, y: f64, buttons: Buttons) -> Self {
        Self::PointerMove {
            x,
            y,
            pointer_id: PointerId(1),
            buttons,
        }
    }

    pub fn pointer_up(x: f64, y: f64) -> Self {
        Self::PointerUp {
            x,
            y,
            pointer_id: PointerId(1),
        }
    }

    /// Screen position, if this event has one.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. }
            | Self::Wheel { x, y, .. } => Some(Point::new(*x, *y)),
            _ => None,
        }
    }
}

/// Modifier flags tracked across key events.
///
/// Only alt and ctrl affect gestures. Both are cleared on key-up and on
/// window blur so a modifier released outside the window cannot stick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    alt: bool,
    ctrl: bool,
}

impl ModifierState {
    pub fn key_down(&mut self, modifiers: Modifiers) {
        self.alt = modifiers.alt;
        self.ctrl = modifiers.ctrl;
    }

    pub fn clear(&mut self) {
        self.alt = false;
        self.ctrl = false;
    }

    pub fn snapshot(&self) -> Modifiers {
        Modifiers {
            alt: self.alt,
            ctrl: self.ctrl,
            ..Modifiers::NONE
        }
    }
}
