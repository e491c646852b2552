//! Input abstraction layer.
//!
//! Normalizes browser pointer, wheel, and keyboard events into a unified
//! `InputEvent` in screen space, consumed by the controller and gestures.

use kurbo::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

impl PointerButton {
    /// Map a DOM `MouseEvent.button` value.
    pub fn from_dom(button: i16) -> Self {
        match button {
            1 => PointerButton::Middle,
            2 => PointerButton::Secondary,
            _ => PointerButton::Primary,
        }
    }
}

/// A normalized input event. Coordinates are screen pixels relative to the
/// board's top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        x: f64,
        y: f64,
        button: PointerButton,
    },
    PointerMove {
        x: f64,
        y: f64,
    },
    PointerUp {
        x: f64,
        y: f64,
    },
    /// Pointer left the board element. Ends press-and-hold gestures.
    PointerLeave,
    /// Wheel zoom. `delta_y` is in pixels (`deltaMode` 0).
    Wheel {
        x: f64,
        y: f64,
        delta_y: f64,
    },
    DoubleClick {
        x: f64,
        y: f64,
    },
    ContextMenu {
        x: f64,
        y: f64,
    },
    Key {
        key: String,
    },
}

impl InputEvent {
    pub fn pointer_down(x: f64, y: f64) -> Self {
        Self::PointerDown {
            x,
            y,
            button: PointerButton::Primary,
        }
    }

    pub fn pointer_move(x: f64, y: f64) -> Self {
        Self::PointerMove { x, y }
    }

    pub fn pointer_up(x: f64, y: f64) -> Self {
        Self::PointerUp { x, y }
    }

    /// Extract the screen position, if the event has one.
    pub fn position(&self) -> Option<Point> {
        match *self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y }
            | Self::PointerUp { x, y }
            | Self::Wheel { x, y, .. }
            | Self::DoubleClick { x, y }
            | Self::ContextMenu { x, y } => Some(Point::new(x, y)),
            Self::PointerLeave | Self::Key { .. } => None,
        }
    }

    /// Whether this event ends a press: release or leaving the board.
    pub fn ends_press(&self) -> bool {
        matches!(self, Self::PointerUp { .. } | Self::PointerLeave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions() {
        assert_eq!(
            InputEvent::pointer_down(3.0, 4.0).position(),
            Some(Point::new(3.0, 4.0))
        );
        assert_eq!(InputEvent::PointerLeave.position(), None);
        assert_eq!(InputEvent::Key { key: "n".into() }.position(), None);
    }

    #[test]
    fn press_endings() {
        assert!(InputEvent::pointer_up(0.0, 0.0).ends_press());
        assert!(InputEvent::PointerLeave.ends_press());
        assert!(!InputEvent::pointer_move(0.0, 0.0).ends_press());
    }

    #[test]
    fn dom_buttons() {
        assert_eq!(PointerButton::from_dom(0), PointerButton::Primary);
        assert_eq!(PointerButton::from_dom(2), PointerButton::Secondary);
    }
}
