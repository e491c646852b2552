//! Gesture system for board interactions.
//!
//! A gesture starts on pointer-down over a recognised target and lives
//! until the press ends. Each gesture translates the events it receives
//! into `BoardMutation`s that the controller commits through the engine.
//!
//! | Gesture | Started on | Emits |
//! |---------|-----------|-------|
//! | `PaletteDrag` | palette item | create node/text on release past the palette |
//! | `NodeDrag` | node body | pin while moving, toggle selection on a still click |
//! | `ControlPointDrag` | control handle | control-point offsets in node space |
//! | `RotateHold` | rotation handle | rotation steps on every interval tick |
//! | `LinkControlDrag` | link control circle | curve-control position |
//! | `TextDrag` | text box | text position |
//! | `TextResize` | edit box grip | text size |
//! | `Pan` | background | view translation |

use crate::input::InputEvent;
use crate::sync::BoardMutation;
use cb_core::palette::PaletteItem;
use cb_core::{ElementId, ViewTransform};
use cb_render::{PaletteEntry, RotateDirection};
use kurbo::{Affine, Point, Size, Vec2};
use smallvec::{SmallVec, smallvec};

pub type Mutations = SmallVec<[BoardMutation; 2]>;

/// Screen distance a press may travel and still count as a click.
pub const CLICK_SLOP: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    PaletteDrag,
    NodeDrag,
    ControlPointDrag,
    RotateHold,
    LinkControlDrag,
    TextDrag,
    TextResize,
    Pan,
}

/// Trait for gestures that handle input and produce mutations.
pub trait Gesture {
    fn kind(&self) -> GestureKind;

    /// Handle an input event, returning zero or more mutations.
    fn handle(&mut self, event: &InputEvent, view: &ViewTransform) -> Mutations;

    /// Whether the press that started the gesture has ended.
    fn is_finished(&self) -> bool;

    /// Advance timers by `elapsed_ms`.
    fn tick(&mut self, _elapsed_ms: f64) -> Mutations {
        SmallVec::new()
    }

    /// Preview drawn while the gesture runs.
    fn ghost(&self) -> Option<PaletteEntry> {
        None
    }
}

// ─── Palette Drag ────────────────────────────────────────────────────────

pub struct PaletteDrag {
    item: PaletteItem,
    at: Point,
    /// Screen x beyond which a release creates the element.
    threshold_x: f64,
    finished: bool,
}

impl PaletteDrag {
    pub fn new(item: PaletteItem, at: Point, threshold_x: f64) -> Self {
        Self {
            item,
            at,
            threshold_x,
            finished: false,
        }
    }
}

impl Gesture for PaletteDrag {
    fn kind(&self) -> GestureKind {
        GestureKind::PaletteDrag
    }

    fn handle(&mut self, event: &InputEvent, _view: &ViewTransform) -> Mutations {
        match *event {
            InputEvent::PointerMove { x, y } => {
                self.at = Point::new(x, y);
                SmallVec::new()
            }
            InputEvent::PointerUp { x, y } => {
                self.finished = true;
                let at = Point::new(x, y);
                if x <= self.threshold_x {
                    log::debug!("palette drop at x={x} cancelled");
                    return SmallVec::new();
                }
                match &self.item {
                    PaletteItem::Shape(template) => smallvec![BoardMutation::CreateNode {
                        template: template.clone(),
                        at,
                    }],
                    PaletteItem::Text => smallvec![BoardMutation::CreateText { at }],
                }
            }
            InputEvent::PointerLeave => {
                self.finished = true;
                SmallVec::new()
            }
            _ => SmallVec::new(),
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn ghost(&self) -> Option<PaletteEntry> {
        (!self.finished).then(|| PaletteEntry {
            item: self.item.clone(),
            at: self.at,
        })
    }
}

// ─── Node Drag ───────────────────────────────────────────────────────────

pub struct NodeDrag {
    id: ElementId,
    /// Node position when pressed, board space.
    origin: Point,
    press: Point,
    moved: bool,
    finished: bool,
}

impl NodeDrag {
    /// `press` is in screen space; `origin` is the node's board position.
    /// The node is pinned where it is on press.
    pub fn start(id: ElementId, origin: Point, press: Point) -> (Self, Mutations) {
        let drag = Self {
            id,
            origin,
            press,
            moved: false,
            finished: false,
        };
        let pin = smallvec![BoardMutation::PinNode {
            id,
            x: origin.x,
            y: origin.y,
        }];
        (drag, pin)
    }
}

impl Gesture for NodeDrag {
    fn kind(&self) -> GestureKind {
        GestureKind::NodeDrag
    }

    fn handle(&mut self, event: &InputEvent, view: &ViewTransform) -> Mutations {
        match *event {
            InputEvent::PointerMove { x, y } => {
                let screen = Point::new(x, y);
                if !self.moved && (screen - self.press).hypot() <= CLICK_SLOP {
                    return SmallVec::new();
                }
                self.moved = true;
                let to = self.origin + (screen - self.press) / view.k;
                smallvec![BoardMutation::PinNode {
                    id: self.id,
                    x: to.x,
                    y: to.y,
                }]
            }
            InputEvent::PointerUp { .. } | InputEvent::PointerLeave => {
                self.finished = true;
                let mut out: Mutations = smallvec![BoardMutation::ReleaseNode { id: self.id }];
                if !self.moved && matches!(event, InputEvent::PointerUp { .. }) {
                    out.push(BoardMutation::ToggleSelection { id: self.id });
                }
                out
            }
            _ => SmallVec::new(),
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

// ─── Control Point Drag ──────────────────────────────────────────────────

pub struct ControlPointDrag {
    node: ElementId,
    tag: u32,
    /// Board → node-local transform, fixed for the drag.
    to_local: Affine,
    finished: bool,
}

impl ControlPointDrag {
    pub fn new(node: ElementId, tag: u32, node_transform: Affine) -> Self {
        Self {
            node,
            tag,
            to_local: node_transform.inverse(),
            finished: false,
        }
    }
}

impl Gesture for ControlPointDrag {
    fn kind(&self) -> GestureKind {
        GestureKind::ControlPointDrag
    }

    fn handle(&mut self, event: &InputEvent, view: &ViewTransform) -> Mutations {
        match *event {
            InputEvent::PointerMove { x, y } => {
                let local = self.to_local * view.screen_to_board(Point::new(x, y));
                smallvec![BoardMutation::MoveControlPoint {
                    node: self.node,
                    tag: self.tag,
                    x: local.x,
                    y: local.y,
                }]
            }
            InputEvent::PointerUp { .. } | InputEvent::PointerLeave => {
                self.finished = true;
                SmallVec::new()
            }
            _ => SmallVec::new(),
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

// ─── Rotate Hold ─────────────────────────────────────────────────────────

/// Press-and-hold on a rotation handle: one step per interval until the
/// press ends.
pub struct RotateHold {
    node: ElementId,
    delta: f64,
    interval_ms: f64,
    pending_ms: f64,
    finished: bool,
}

impl RotateHold {
    pub fn new(node: ElementId, direction: RotateDirection, step: f64, interval_ms: f64) -> Self {
        Self {
            node,
            delta: direction.sign() * step,
            interval_ms: interval_ms.max(1.0),
            pending_ms: 0.0,
            finished: false,
        }
    }
}

impl Gesture for RotateHold {
    fn kind(&self) -> GestureKind {
        GestureKind::RotateHold
    }

    fn handle(&mut self, event: &InputEvent, _view: &ViewTransform) -> Mutations {
        if event.ends_press() {
            self.finished = true;
        }
        SmallVec::new()
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn tick(&mut self, elapsed_ms: f64) -> Mutations {
        if self.finished || !elapsed_ms.is_finite() || elapsed_ms <= 0.0 {
            return SmallVec::new();
        }
        self.pending_ms += elapsed_ms;
        let mut out = SmallVec::new();
        while self.pending_ms >= self.interval_ms {
            self.pending_ms -= self.interval_ms;
            out.push(BoardMutation::RotateNode {
                id: self.node,
                delta: self.delta,
            });
        }
        out
    }
}

// ─── Link Control Drag ───────────────────────────────────────────────────

pub struct LinkControlDrag {
    id: ElementId,
    finished: bool,
}

impl LinkControlDrag {
    pub fn new(id: ElementId) -> Self {
        Self { id, finished: false }
    }
}

impl Gesture for LinkControlDrag {
    fn kind(&self) -> GestureKind {
        GestureKind::LinkControlDrag
    }

    fn handle(&mut self, event: &InputEvent, view: &ViewTransform) -> Mutations {
        match *event {
            InputEvent::PointerMove { x, y } => smallvec![BoardMutation::MoveLinkControl {
                id: self.id,
                at: view.screen_to_board(Point::new(x, y)),
            }],
            InputEvent::PointerUp { .. } | InputEvent::PointerLeave => {
                self.finished = true;
                SmallVec::new()
            }
            _ => SmallVec::new(),
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

// ─── Text Drag ───────────────────────────────────────────────────────────

pub struct TextDrag {
    id: ElementId,
    origin: Point,
    press: Point,
    finished: bool,
}

impl TextDrag {
    pub fn new(id: ElementId, origin: Point, press: Point) -> Self {
        Self {
            id,
            origin,
            press,
            finished: false,
        }
    }
}

impl Gesture for TextDrag {
    fn kind(&self) -> GestureKind {
        GestureKind::TextDrag
    }

    fn handle(&mut self, event: &InputEvent, view: &ViewTransform) -> Mutations {
        match *event {
            InputEvent::PointerMove { x, y } => {
                let to = self.origin + (Point::new(x, y) - self.press) / view.k;
                smallvec![BoardMutation::MoveText {
                    id: self.id,
                    x: to.x,
                    y: to.y,
                }]
            }
            InputEvent::PointerUp { .. } | InputEvent::PointerLeave => {
                self.finished = true;
                SmallVec::new()
            }
            _ => SmallVec::new(),
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

// ─── Text Resize ─────────────────────────────────────────────────────────

pub struct TextResize {
    id: ElementId,
    start: Size,
    press: Point,
    finished: bool,
}

impl TextResize {
    pub fn new(id: ElementId, start: Size, press: Point) -> Self {
        Self {
            id,
            start,
            press,
            finished: false,
        }
    }
}

impl Gesture for TextResize {
    fn kind(&self) -> GestureKind {
        GestureKind::TextResize
    }

    fn handle(&mut self, event: &InputEvent, view: &ViewTransform) -> Mutations {
        match *event {
            InputEvent::PointerMove { x, y } => {
                let d = (Point::new(x, y) - self.press) / view.k;
                smallvec![BoardMutation::ResizeText {
                    id: self.id,
                    width: self.start.width + d.x,
                    height: self.start.height + d.y,
                }]
            }
            InputEvent::PointerUp { .. } | InputEvent::PointerLeave => {
                self.finished = true;
                SmallVec::new()
            }
            _ => SmallVec::new(),
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

// ─── Pan ─────────────────────────────────────────────────────────────────

pub struct Pan {
    last: Point,
    finished: bool,
}

impl Pan {
    pub fn new(press: Point) -> Self {
        Self {
            last: press,
            finished: false,
        }
    }
}

impl Gesture for Pan {
    fn kind(&self) -> GestureKind {
        GestureKind::Pan
    }

    fn handle(&mut self, event: &InputEvent, _view: &ViewTransform) -> Mutations {
        match *event {
            InputEvent::PointerMove { x, y } => {
                let p = Point::new(x, y);
                let Vec2 { x: dx, y: dy } = p - self.last;
                self.last = p;
                smallvec![BoardMutation::Pan { dx, dy }]
            }
            InputEvent::PointerUp { .. } | InputEvent::PointerLeave => {
                self.finished = true;
                SmallVec::new()
            }
            _ => SmallVec::new(),
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cb_core::palette::default_templates;
    use pretty_assertions::assert_eq;

    const VIEW: ViewTransform = ViewTransform::IDENTITY;

    #[test]
    fn palette_release_past_threshold_creates() {
        let template = default_templates()[1].clone();
        let mut drag = PaletteDrag::new(
            PaletteItem::Shape(template.clone()),
            Point::new(40.0, 200.0),
            80.0,
        );
        drag.handle(&InputEvent::pointer_move(300.0, 250.0), &VIEW);
        assert_eq!(drag.ghost().map(|g| g.at), Some(Point::new(300.0, 250.0)));
        let out = drag.handle(&InputEvent::pointer_up(300.0, 250.0), &VIEW);
        assert_eq!(
            out.into_vec(),
            vec![BoardMutation::CreateNode {
                template,
                at: Point::new(300.0, 250.0)
            }]
        );
        assert!(drag.is_finished());
        assert!(drag.ghost().is_none());
    }

    #[test]
    fn palette_release_over_palette_cancels() {
        let mut drag = PaletteDrag::new(PaletteItem::Text, Point::new(40.0, 200.0), 80.0);
        let out = drag.handle(&InputEvent::pointer_up(60.0, 210.0), &VIEW);
        assert!(out.is_empty());
        assert!(drag.is_finished());
    }

    #[test]
    fn still_click_toggles_selection() {
        let id = ElementId::node();
        let (mut drag, pin) = NodeDrag::start(id, Point::new(10.0, 10.0), Point::new(10.0, 10.0));
        assert_eq!(pin.len(), 1);
        assert!(drag.handle(&InputEvent::pointer_move(11.0, 10.0), &VIEW).is_empty());
        let out = drag.handle(&InputEvent::pointer_up(11.0, 10.0), &VIEW);
        assert_eq!(
            out.into_vec(),
            vec![
                BoardMutation::ReleaseNode { id },
                BoardMutation::ToggleSelection { id }
            ]
        );
    }

    #[test]
    fn drag_keeps_the_grab_offset() {
        let id = ElementId::node();
        let view = ViewTransform { x: 0.0, y: 0.0, k: 2.0 };
        let (mut drag, _) = NodeDrag::start(id, Point::new(10.0, 10.0), Point::new(25.0, 20.0));
        let out = drag.handle(&InputEvent::pointer_move(45.0, 20.0), &view);
        assert_eq!(
            out.into_vec(),
            vec![BoardMutation::PinNode { id, x: 20.0, y: 10.0 }]
        );
        let out = drag.handle(&InputEvent::pointer_up(45.0, 20.0), &view);
        assert_eq!(out.into_vec(), vec![BoardMutation::ReleaseNode { id }]);
    }

    #[test]
    fn control_point_moves_in_node_space() {
        let node = ElementId::node();
        let transform = Affine::translate((100.0, 0.0));
        let mut drag = ControlPointDrag::new(node, 1, transform);
        let out = drag.handle(&InputEvent::pointer_move(150.0, 10.0), &VIEW);
        assert_eq!(
            out.into_vec(),
            vec![BoardMutation::MoveControlPoint {
                node,
                tag: 1,
                x: 50.0,
                y: 10.0
            }]
        );
    }

    #[test]
    fn rotation_steps_per_interval_until_release() {
        let node = ElementId::node();
        let mut hold = RotateHold::new(node, RotateDirection::Backward, 1.0, 16.0);
        assert!(hold.tick(10.0).is_empty());
        let out = hold.tick(30.0);
        assert_eq!(
            out.into_vec(),
            vec![
                BoardMutation::RotateNode { id: node, delta: -1.0 },
                BoardMutation::RotateNode { id: node, delta: -1.0 }
            ]
        );
        hold.handle(&InputEvent::PointerLeave, &VIEW);
        assert!(hold.is_finished());
        assert!(hold.tick(100.0).is_empty());
    }

    #[test]
    fn pan_emits_incremental_deltas() {
        let mut pan = Pan::new(Point::new(0.0, 0.0));
        pan.handle(&InputEvent::pointer_move(5.0, 5.0), &VIEW);
        let out = pan.handle(&InputEvent::pointer_move(8.0, 1.0), &VIEW);
        assert_eq!(
            out.into_vec(),
            vec![BoardMutation::Pan { dx: 3.0, dy: -4.0 }]
        );
    }

    #[test]
    fn text_resize_tracks_pointer_in_board_units() {
        let id = ElementId::text();
        let view = ViewTransform { x: 0.0, y: 0.0, k: 2.0 };
        let mut resize = TextResize::new(id, Size::new(100.0, 50.0), Point::new(0.0, 0.0));
        let out = resize.handle(&InputEvent::pointer_move(40.0, 20.0), &view);
        assert_eq!(
            out.into_vec(),
            vec![BoardMutation::ResizeText {
                id,
                width: 120.0,
                height: 60.0
            }]
        );
    }
}
