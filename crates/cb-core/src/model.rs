//! Board data model: shape nodes, links, and text blocks.
//!
//! Nodes own their control points; links only reference nodes by id.
//! Geometry is kept in board space (independent of pan/zoom).

use crate::error::{BoardError, BoardResult};
use crate::id::ElementId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

// ─── Colors ──────────────────────────────────────────────────────────────

/// Opaque RGB color, as produced by a `<input type="color">`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const LIGHT_BLUE: Color = Color::rgb(0xAD, 0xD8, 0xE6);
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RGB` or `#RRGGBB` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> BoardResult<Self> {
        let invalid = || BoardError::InvalidColor(hex.to_string());
        let digits = hex.strip_prefix('#').unwrap_or(hex).as_bytes();
        let nibble = |i: usize| hex_val(digits[i]).ok_or_else(invalid);
        match digits.len() {
            3 => Ok(Self::rgb(nibble(0)? * 17, nibble(1)? * 17, nibble(2)? * 17)),
            6 => Ok(Self::rgb(
                nibble(0)? << 4 | nibble(1)?,
                nibble(2)? << 4 | nibble(3)?,
                nibble(4)? << 4 | nibble(5)?,
            )),
            _ => Err(invalid()),
        }
    }

    /// Emit as `#RRGGBB`.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ─── Path data ───────────────────────────────────────────────────────────

/// A single path command (SVG-like, absolute coordinates).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathCmd {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    QuadTo(f64, f64, f64, f64), // control, end
    /// Elliptical arc to `(x, y)`.
    ArcTo {
        rx: f64,
        ry: f64,
        large_arc: bool,
        sweep: bool,
        x: f64,
        y: f64,
    },
    Close,
}

// ─── Shape nodes ─────────────────────────────────────────────────────────

/// The closed set of shape kinds a node can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Ellipse spanned by the first two control points.
    Circle,
    Square,
    Triangle,
    Diamond,
    /// Generic closed polyline.
    Path,
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Circle => "circle",
            ShapeKind::Square => "square",
            ShapeKind::Triangle => "triangle",
            ShapeKind::Diamond => "diamond",
            ShapeKind::Path => "path",
        }
    }
}

impl FromStr for ShapeKind {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "circle" => Ok(ShapeKind::Circle),
            "square" => Ok(ShapeKind::Square),
            "triangle" => Ok(ShapeKind::Triangle),
            "diamond" => Ok(ShapeKind::Diamond),
            "path" => Ok(ShapeKind::Path),
            other => Err(BoardError::UnsupportedShape(other.to_string())),
        }
    }
}

/// A tagged offset relative to the node's origin.
/// The tag correlates the point with its on-canvas drag handle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub x: f64,
    pub y: f64,
    pub tag: u32,
}

impl ControlPoint {
    pub const fn new(x: f64, y: f64, tag: u32) -> Self {
        Self { x, y, tag }
    }
}

pub type ControlPoints = SmallVec<[ControlPoint; 4]>;

/// A shape placed on the board.
///
/// The number of control points and their tags are fixed when the node is
/// created from its template; only the offsets move afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeNode {
    pub id: ElementId,
    pub shape: ShapeKind,
    points: ControlPoints,
    /// Degrees, kept in (-360, 360).
    pub rotation: f64,
    pub color: Color,
    /// Resting position in board space.
    pub x: f64,
    pub y: f64,
    /// Raw screen position the node was dropped at.
    pub start_x: f64,
    pub start_y: f64,
    /// Fixed position while pinned (dragged, or pinned in manual mode).
    pub pinned: Option<(f64, f64)>,
    /// Velocity used by the simulated positioning strategy.
    #[serde(skip)]
    pub vx: f64,
    #[serde(skip)]
    pub vy: f64,
}

impl ShapeNode {
    pub fn new(id: ElementId, shape: ShapeKind, points: ControlPoints, color: Color) -> Self {
        Self {
            id,
            shape,
            points,
            rotation: 0.0,
            color,
            x: 0.0,
            y: 0.0,
            start_x: 0.0,
            start_y: 0.0,
            pinned: None,
            vx: 0.0,
            vy: 0.0,
        }
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    /// Rendered position: the pinned position when fixed, otherwise the
    /// resting position.
    pub fn position(&self) -> (f64, f64) {
        self.pinned.unwrap_or((self.x, self.y))
    }

    /// Move the control point tagged `tag` to a new offset.
    pub fn move_point(&mut self, tag: u32, x: f64, y: f64) -> BoardResult<()> {
        let point = self
            .points
            .iter_mut()
            .find(|p| p.tag == tag)
            .ok_or(BoardError::UnknownControlPoint { node: self.id, tag })?;
        point.x = x;
        point.y = y;
        Ok(())
    }

    /// Rotate by `delta` degrees, wrapping at ±360.
    pub fn rotate_by(&mut self, delta: f64) {
        let next = (self.rotation + delta) % 360.0;
        self.rotation = if next.is_finite() { next } else { 0.0 };
    }
}

// ─── Links ───────────────────────────────────────────────────────────────

/// How a link path is drawn between its two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStyle {
    /// Quadratic curve whose control point sits at `midpoint + 2 × offset`.
    #[default]
    Bezier,
    /// Two straight segments meeting at `midpoint + offset`.
    Line,
}

impl LinkStyle {
    pub fn toggled(self) -> Self {
        match self {
            LinkStyle::Bezier => LinkStyle::Line,
            LinkStyle::Line => LinkStyle::Bezier,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LinkStyle::Bezier => "bezier",
            LinkStyle::Line => "line",
        }
    }
}

/// A connection between two shape nodes. Does not own the nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: ElementId,
    pub source: ElementId,
    pub target: ElementId,
    /// Straight-line distance at creation time; the rest length used by the
    /// simulated positioning strategy.
    pub distance: f64,
    pub color: Color,
    /// Curve-control offset from the midpoint of source and target.
    pub cx: f64,
    pub cy: f64,
    pub style: LinkStyle,
    pub arrows: bool,
    pub arrows_reversed: bool,
    /// Glyph colors at 25/50/75%: source color, link color, target color.
    /// Captured at creation and refreshed on request.
    pub arrow_colors: [Color; 3],
}

// ─── Text blocks ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Normal,
    #[default]
    Bold,
}

impl FontWeight {
    pub fn css(&self) -> &'static str {
        match self {
            FontWeight::Normal => "normal",
            FontWeight::Bold => "bold",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    pub size: f64,
    pub weight: FontWeight,
}

impl FontSpec {
    /// CSS `font` shorthand, e.g. `bold 18px Arial`.
    pub fn css(&self) -> String {
        format!("{} {}px {}", self.weight.css(), self.size, self.family)
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Arial".into(),
            size: 18.0,
            weight: FontWeight::Bold,
        }
    }
}

/// A free-standing block of text on the board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    pub id: ElementId,
    pub text: String,
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
    pub font: FontSpec,
    pub color: Color,
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn color_hex_forms() {
        assert_eq!(Color::from_hex("#ADD8E6").unwrap(), Color::LIGHT_BLUE);
        assert_eq!(Color::from_hex("add8e6").unwrap(), Color::LIGHT_BLUE);
        assert_eq!(Color::from_hex("#fff").unwrap(), Color::WHITE);
        assert_eq!(Color::LIGHT_BLUE.to_hex(), "#ADD8E6");
        assert!(matches!(
            Color::from_hex("#12345"),
            Err(BoardError::InvalidColor(_))
        ));
        assert!(Color::from_hex("#GG0000").is_err());
    }

    #[test]
    fn shape_kind_names() {
        for kind in [
            ShapeKind::Circle,
            ShapeKind::Square,
            ShapeKind::Triangle,
            ShapeKind::Diamond,
            ShapeKind::Path,
        ] {
            assert_eq!(kind.name().parse::<ShapeKind>().unwrap(), kind);
        }
        assert_eq!(
            "hexagon".parse::<ShapeKind>(),
            Err(BoardError::UnsupportedShape("hexagon".into()))
        );
    }

    #[test]
    fn move_point_keeps_count_and_tags() {
        let mut node = ShapeNode::new(
            ElementId::node(),
            ShapeKind::Circle,
            smallvec![ControlPoint::new(-30.0, -30.0, 0), ControlPoint::new(30.0, 30.0, 1)],
            Color::LIGHT_BLUE,
        );
        node.move_point(1, 50.0, 10.0).unwrap();
        assert_eq!(node.points().len(), 2);
        assert_eq!(node.points()[1], ControlPoint::new(50.0, 10.0, 1));
        assert!(node.move_point(7, 0.0, 0.0).is_err());
    }

    #[test]
    fn rotation_wraps_at_full_turn() {
        let mut node = ShapeNode::new(
            ElementId::node(),
            ShapeKind::Square,
            SmallVec::new(),
            Color::LIGHT_BLUE,
        );
        for _ in 0..360 {
            node.rotate_by(1.0);
        }
        assert_eq!(node.rotation, 0.0);
        for _ in 0..361 {
            node.rotate_by(-1.0);
        }
        assert_eq!(node.rotation, -1.0);
    }

    #[test]
    fn font_css_shorthand() {
        assert_eq!(FontSpec::default().css(), "bold 18px Arial");
    }
}
