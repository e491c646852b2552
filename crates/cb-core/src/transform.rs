//! Pan/zoom view transform.
//!
//! Maps board space to screen space as `screen = board × k + (x, y)`.
//! Zoom is clamped to the configured scale extent, and translation is
//! constrained so the viewport never leaves the pan extent around the
//! origin.

use crate::config::BoardConfig;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// The board's current pan/zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    /// Horizontal translation in screen pixels.
    pub x: f64,
    /// Vertical translation in screen pixels.
    pub y: f64,
    /// Scale factor.
    pub k: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Bounds the gesture recognizer enforces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Board-space rectangle the viewport must stay inside.
    pub extent: Rect,
}

impl ZoomLimits {
    pub fn from_config(config: &BoardConfig) -> Self {
        let [min_scale, max_scale] = config.scale_extent;
        Self {
            min_scale,
            max_scale,
            extent: Rect::new(
                -config.extent_width,
                -config.extent_height,
                config.extent_width,
                config.extent_height,
            ),
        }
    }

    pub fn clamp_scale(&self, k: f64) -> f64 {
        if k.is_nan() {
            return self.min_scale;
        }
        k.clamp(self.min_scale, self.max_scale)
    }
}

impl ViewTransform {
    pub const IDENTITY: ViewTransform = ViewTransform {
        x: 0.0,
        y: 0.0,
        k: 1.0,
    };

    /// Screen → board: subtract translation, divide by scale.
    pub fn screen_to_board(&self, p: Point) -> Point {
        Point::new((p.x - self.x) / self.k, (p.y - self.y) / self.k)
    }

    /// Board → screen.
    pub fn board_to_screen(&self, p: Point) -> Point {
        Point::new(p.x * self.k + self.x, p.y * self.k + self.y)
    }

    /// The board-space rectangle currently visible in a viewport.
    pub fn visible_rect(&self, viewport: Size) -> Rect {
        Rect::from_points(
            self.screen_to_board(Point::ZERO),
            self.screen_to_board(Point::new(viewport.width, viewport.height)),
        )
    }

    /// Scale by `factor` keeping the board point under `anchor` (screen
    /// space) fixed, then constrain.
    pub fn zoom_about(
        &self,
        factor: f64,
        anchor: Point,
        viewport: Size,
        limits: &ZoomLimits,
    ) -> ViewTransform {
        let k = limits.clamp_scale(self.k * factor);
        let board = self.screen_to_board(anchor);
        let zoomed = ViewTransform {
            x: anchor.x - board.x * k,
            y: anchor.y - board.y * k,
            k,
        };
        zoomed.constrain(viewport, limits)
    }

    /// Translate by a screen-space delta, then constrain.
    pub fn pan_by(&self, dx: f64, dy: f64, viewport: Size, limits: &ZoomLimits) -> ViewTransform {
        ViewTransform {
            x: self.x + dx,
            y: self.y + dy,
            k: self.k,
        }
        .constrain(viewport, limits)
    }

    /// Shift the transform so the visible rectangle lies inside the pan
    /// extent. When the viewport is larger than the extent on an axis, the
    /// extent is centered on that axis instead.
    pub fn constrain(&self, viewport: Size, limits: &ZoomLimits) -> ViewTransform {
        let k = limits.clamp_scale(self.k);
        let view = ViewTransform { k, ..*self };
        let visible = view.visible_rect(viewport);
        let extent = limits.extent;

        let dx0 = visible.x0 - extent.x0;
        let dx1 = visible.x1 - extent.x1;
        let dy0 = visible.y0 - extent.y0;
        let dy1 = visible.y1 - extent.y1;

        // Board-space shift to apply to the visible rectangle.
        let shift = |d0: f64, d1: f64| {
            if d1 > d0 {
                (d0 + d1) / 2.0
            } else if d0 < 0.0 {
                d0
            } else if d1 > 0.0 {
                d1
            } else {
                0.0
            }
        };
        let sx = shift(dx0, dx1);
        let sy = shift(dy0, dy1);

        ViewTransform {
            x: view.x + sx * k,
            y: view.y + sy * k,
            k,
        }
    }
}
