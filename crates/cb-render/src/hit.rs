//! Hit testing: board point → element lookup.
//!
//! Walks the scene in reverse paint order so the topmost element wins.
//! Paint order is grid, links, nodes, texts.

use crate::scene::{LinkGeometry, NodeVisual, Scene, TextVisual};
use cb_core::ElementId;
use kurbo::{Affine, ParamCurveNearest, Point, Shape, Vec2};
use serde::Serialize;

const NEAREST_ACCURACY: f64 = 1e-3;

/// Extra slack around link strokes and handles.
const TOLERANCE: f64 = 2.0;

/// Side of the square at the edit box's bottom-right corner that resizes it.
/// The square sits inside the `width` by `height` textarea, not the padded
/// foreign object around it.
pub const TEXT_RESIZE_GRIP: f64 = 12.0;

/// Which rotation handle was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RotateDirection {
    /// First handle; turns counter-clockwise.
    Backward,
    /// Last handle; turns clockwise.
    Forward,
}

impl RotateDirection {
    pub fn sign(self) -> f64 {
        match self {
            RotateDirection::Backward => -1.0,
            RotateDirection::Forward => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "target", rename_all = "camelCase")]
pub enum HitTarget {
    Background,
    Node { id: ElementId },
    ControlHandle { node: ElementId, tag: u32 },
    RotateHandle { node: ElementId, direction: RotateDirection },
    LinkControl { id: ElementId },
    Link { id: ElementId },
    Text { id: ElementId },
    TextResize { id: ElementId },
}

impl HitTarget {
    /// The element the hit belongs to, if any.
    pub fn element(&self) -> Option<ElementId> {
        match *self {
            HitTarget::Background => None,
            HitTarget::Node { id }
            | HitTarget::LinkControl { id }
            | HitTarget::Link { id }
            | HitTarget::Text { id }
            | HitTarget::TextResize { id } => Some(id),
            HitTarget::ControlHandle { node, .. } | HitTarget::RotateHandle { node, .. } => {
                Some(node)
            }
        }
    }
}

/// Find the topmost target at a board-space point.
pub fn hit_test(scene: &Scene, p: Point) -> HitTarget {
    for text in scene.texts().iter().rev() {
        if let Some(hit) = hit_text(text, p) {
            return hit;
        }
    }
    for node in scene.nodes().iter().rev() {
        if let Some(hit) = hit_node(scene, node, p) {
            return hit;
        }
    }
    let control_reach = scene.link_control_radius + TOLERANCE;
    for link in scene.links().iter().rev() {
        if (p - link.control).hypot() <= control_reach {
            return HitTarget::LinkControl { id: link.id };
        }
    }
    let stroke_reach = scene.link_stroke_width / 2.0 + TOLERANCE;
    for link in scene.links().iter().rev() {
        if distance_to_link(&link.geometry, p) <= stroke_reach {
            return HitTarget::Link { id: link.id };
        }
    }
    HitTarget::Background
}

fn hit_text(text: &TextVisual, p: Point) -> Option<HitTarget> {
    let size = text.box_size();
    let local = p - Vec2::new(text.x, text.y);
    if local.x < 0.0 || local.y < 0.0 || local.x > size.width || local.y > size.height {
        return None;
    }
    let on_grip =
        |at: f64, edge: f64| (edge - TEXT_RESIZE_GRIP..=edge + TOLERANCE).contains(&at);
    if text.is_editing() && on_grip(local.x, text.width) && on_grip(local.y, text.height) {
        return Some(HitTarget::TextResize { id: text.id });
    }
    Some(HitTarget::Text { id: text.id })
}

/// Node transform: translate to the position, then rotate about it.
pub fn node_transform(node: &NodeVisual) -> Affine {
    Affine::translate((node.x, node.y)) * Affine::rotate(node.rotation.to_radians())
}

fn hit_node(scene: &Scene, node: &NodeVisual, p: Point) -> Option<HitTarget> {
    let local = node_transform(node).inverse() * p;
    let reach = scene.handle_radius + TOLERANCE;

    // The last handle is painted above the first.
    if let Some((first, last)) = node.rotate_handles {
        if (local - last).hypot() <= reach {
            return Some(HitTarget::RotateHandle {
                node: node.id,
                direction: RotateDirection::Forward,
            });
        }
        if (local - first).hypot() <= reach {
            return Some(HitTarget::RotateHandle {
                node: node.id,
                direction: RotateDirection::Backward,
            });
        }
    }
    if let Some(handle) = node
        .handles
        .iter()
        .rev()
        .find(|h| (local - Point::new(h.x, h.y)).hypot() <= reach)
    {
        return Some(HitTarget::ControlHandle {
            node: node.id,
            tag: handle.tag,
        });
    }
    node.outline
        .as_ref()
        .filter(|outline| outline.contains(local))
        .map(|_| HitTarget::Node { id: node.id })
}

fn distance_to_link(geometry: &LinkGeometry, p: Point) -> f64 {
    match geometry {
        LinkGeometry::Curve(q) => q.nearest(p, NEAREST_ACCURACY).distance_sq.sqrt(),
        LinkGeometry::Polyline(a, b) => a
            .nearest(p, NEAREST_ACCURACY)
            .distance_sq
            .min(b.nearest(p, NEAREST_ACCURACY).distance_sq)
            .sqrt(),
    }
}
