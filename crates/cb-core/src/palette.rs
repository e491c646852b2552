//! Palette templates: the shapes a user can drag onto the board.
//!
//! Consumed once when the palette is built. Each created node receives its
//! own copy of the template's control points.

use crate::model::{ControlPoint, ControlPoints, ShapeKind};
use serde::{Deserialize, Serialize};
use smallvec::smallvec;

/// Default shape → control-point list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeTemplate {
    pub shape: ShapeKind,
    pub points: ControlPoints,
}

/// Something that can be dragged out of the palette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PaletteItem {
    Shape(ShapeTemplate),
    Text,
}

/// The four default shapes, in palette order.
pub fn default_templates() -> Vec<ShapeTemplate> {
    let p = ControlPoint::new;
    vec![
        ShapeTemplate {
            shape: ShapeKind::Circle,
            points: smallvec![p(-30.0, -30.0, 0), p(30.0, 30.0, 1)],
        },
        ShapeTemplate {
            shape: ShapeKind::Square,
            points: smallvec![
                p(-30.0, -20.0, 0),
                p(30.0, -20.0, 1),
                p(30.0, 20.0, 2),
                p(-30.0, 20.0, 3)
            ],
        },
        ShapeTemplate {
            shape: ShapeKind::Triangle,
            points: smallvec![p(0.0, -30.0, 0), p(30.0, 30.0, 1), p(-30.0, 30.0, 2)],
        },
        ShapeTemplate {
            shape: ShapeKind::Diamond,
            points: smallvec![
                p(-30.0, 0.0, 0),
                p(0.0, -30.0, 1),
                p(30.0, 0.0, 2),
                p(0.0, 30.0, 3)
            ],
        },
    ]
}

/// Shapes followed by the text item.
pub fn default_palette() -> Vec<PaletteItem> {
    default_templates()
        .into_iter()
        .map(PaletteItem::Shape)
        .chain(std::iter::once(PaletteItem::Text))
        .collect()
}
