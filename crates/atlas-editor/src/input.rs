//! Input abstraction layer.
//!
//! Normalizes mouse and touch events from the rendering surface into a
//! unified `InputEvent` consumed by the interaction controller.

use kurbo::Point;

/// A normalized input event, in the same screen coordinates as the
/// geometry the renderer reports.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed (mouse down, touch start).
    PointerDown { x: f64, y: f64 },

    /// Pointer moved.
    PointerMove { x: f64, y: f64 },

    /// Pointer released.
    PointerUp { x: f64, y: f64 },

    /// The platform took the pointer away (touch cancel, focus loss).
    PointerCancel,

    /// Keyboard key.
    Key {
        key: String,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
    },
}

impl InputEvent {
    pub fn down(x: f64, y: f64) -> Self {
        Self::PointerDown { x, y }
    }

    pub fn moved(x: f64, y: f64) -> Self {
        Self::PointerMove { x, y }
    }

    pub fn up(x: f64, y: f64) -> Self {
        Self::PointerUp { x, y }
    }

    /// A bare key press without modifiers.
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key {
            key: key.into(),
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
        }
    }

    /// Extract position if this is a pointer event.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y } | Self::PointerMove { x, y } | Self::PointerUp { x, y } => {
                Some(Point::new(*x, *y))
            }
            _ => None,
        }
    }

    /// Pointer cancel or Escape: abort the current gesture.
    pub fn is_cancel(&self) -> bool {
        match self {
            Self::PointerCancel => true,
            Self::Key { key, .. } => key == "Escape",
            _ => false,
        }
    }
}
