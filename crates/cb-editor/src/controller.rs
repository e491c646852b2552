//! Board controller: routes input to gestures, menus, and the engine.
//!
//! Owns everything transient about the interaction (active gesture, open
//! context menu, palette layout and visibility) and leaves the diagram
//! itself to `BoardEngine`.

use crate::input::{InputEvent, PointerButton};
use crate::menu::{ContextMenu, MenuAction, MenuTarget};
use crate::signal::{GridToggleReceiver, GridToggleSender, menu_signal};
use crate::sync::{BoardEngine, BoardMutation, Commit};
use crate::tools::{
    ControlPointDrag, Gesture, GestureKind, LinkControlDrag, NodeDrag, Pan, PaletteDrag,
    RotateHold, TextDrag, TextResize,
};
use cb_core::palette::{PaletteItem, default_palette};
use cb_core::{BoardConfig, BoardResult, ElementId};
use cb_render::{HitTarget, Overlay, PaletteEntry, hit_test, node_transform};
use kurbo::{Point, Size};

/// Wheel delta → zoom exponent, base 2.
const WHEEL_ZOOM_RATE: f64 = 0.002;
const DOUBLE_CLICK_ZOOM: f64 = 2.0;

pub struct BoardController {
    engine: BoardEngine,
    palette: Vec<PaletteEntry>,
    palette_visible: bool,
    gesture: Option<Box<dyn Gesture>>,
    menu: Option<ContextMenu>,
    grid_signal: GridToggleReceiver,
    grid_sender: GridToggleSender,
    last_tick_ms: Option<f64>,
}

impl BoardController {
    pub fn new(config: BoardConfig, viewport: Size) -> Self {
        let (grid_sender, grid_signal) = menu_signal();
        let palette_visible = config.palette.visible;
        let mut controller = Self {
            engine: BoardEngine::new(config, viewport),
            palette: Vec::new(),
            palette_visible,
            gesture: None,
            menu: None,
            grid_signal,
            grid_sender,
            last_tick_ms: None,
        };
        controller.layout_palette();
        controller
    }

    pub fn engine(&self) -> &BoardEngine {
        &self.engine
    }

    /// A sender for the navigation control's grid toggle.
    pub fn grid_signal(&self) -> GridToggleSender {
        self.grid_sender.clone()
    }

    pub fn menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }

    pub fn palette(&self) -> &[PaletteEntry] {
        &self.palette
    }

    pub fn palette_visible(&self) -> bool {
        self.palette_visible
    }

    pub fn active_gesture(&self) -> Option<GestureKind> {
        self.gesture.as_ref().map(|g| g.kind())
    }

    pub fn resize(&mut self, viewport: Size) {
        self.engine.set_viewport(viewport);
        self.layout_palette();
    }

    /// Place palette items in a column near the left edge: shapes first,
    /// then the text item.
    fn layout_palette(&mut self) {
        let Size { width, height } = self.engine.viewport();
        let items = default_palette();
        let shapes = items
            .iter()
            .filter(|i| matches!(i, PaletteItem::Shape(_)))
            .count() as f64;
        let top = height / 2.0 - (height / 10.0) * shapes + 100.0;
        let spacing = self.engine.config.palette.item_spacing;
        self.palette = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| PaletteEntry {
                item,
                at: Point::new(width / 20.0, top + (i as f64 + 1.0) * spacing),
            })
            .collect();
    }

    pub fn toggle_palette(&mut self) -> bool {
        self.palette_visible = !self.palette_visible;
        log::debug!("palette visible: {}", self.palette_visible);
        self.palette_visible
    }

    fn palette_threshold(&self) -> f64 {
        self.engine.viewport().width * self.engine.config.palette.width_ratio
    }

    fn palette_item_at(&self, p: Point) -> Option<&PaletteEntry> {
        if !self.palette_visible {
            return None;
        }
        let radius = self.engine.config.palette.item_radius;
        self.palette.iter().find(|e| (e.at - p).hypot() <= radius)
    }

    /// Screen-space decorations for the next frame.
    pub fn overlay(&self) -> Overlay {
        Overlay {
            palette: self.palette.clone(),
            palette_visible: self.palette_visible,
            ghost: self.gesture.as_ref().and_then(|g| g.ghost()),
            palette_fill: Some(self.engine.config.colors.node),
        }
    }

    pub fn render_svg(&self) -> String {
        self.engine.render_svg(&self.overlay())
    }

    /// Flip grid visibility once per pending signal. Returns whether the
    /// grid changed.
    pub fn poll_signals(&mut self) -> bool {
        let pending = self.grid_signal.drain();
        if pending % 2 == 1 {
            let hidden = self.engine.scene.toggle_grid();
            log::debug!("grid hidden: {hidden}");
        }
        pending % 2 == 1
    }

    fn commit(&mut self, mutations: impl IntoIterator<Item = BoardMutation>) -> Commit {
        self.engine.commit(mutations)
    }

    /// Route one input event. Returns whether the board needs a redraw.
    pub fn handle(&mut self, event: &InputEvent) -> bool {
        let mut dirty = self.poll_signals();
        dirty |= match event {
            InputEvent::PointerDown { x, y, button } => self.pointer_down(Point::new(*x, *y), *button),
            InputEvent::PointerMove { .. } | InputEvent::PointerUp { .. } | InputEvent::PointerLeave => {
                self.forward_to_gesture(event)
            }
            InputEvent::Wheel { x, y, delta_y } => {
                let factor = (-delta_y * WHEEL_ZOOM_RATE).exp2();
                self.commit([BoardMutation::Zoom {
                    factor,
                    anchor: Point::new(*x, *y),
                }]);
                true
            }
            InputEvent::DoubleClick { x, y } => self.double_click(Point::new(*x, *y)),
            InputEvent::ContextMenu { x, y } => self.open_menu(Point::new(*x, *y)),
            InputEvent::Key { key } => self.key(key),
        };
        dirty
    }

    fn forward_to_gesture(&mut self, event: &InputEvent) -> bool {
        let Some(gesture) = self.gesture.as_mut() else {
            return false;
        };
        let mutations = gesture.handle(event, self.engine.view());
        let finished = gesture.is_finished();
        let kind = gesture.kind();
        if finished {
            log::trace!("{kind:?} finished");
            self.gesture = None;
        }
        self.commit(mutations);
        true
    }

    fn pointer_down(&mut self, screen: Point, button: PointerButton) -> bool {
        if button != PointerButton::Primary {
            return false;
        }
        let mut dirty = false;
        if let Some(menu) = &self.menu {
            if menu.contains(screen) {
                return false;
            }
            self.menu = None;
            dirty = true;
        }

        if let Some(entry) = self.palette_item_at(screen) {
            let drag = PaletteDrag::new(entry.item.clone(), screen, self.palette_threshold());
            self.gesture = Some(Box::new(drag));
            return true;
        }

        let board = self.engine.screen_to_board(screen);
        let hit = hit_test(&self.engine.scene, board);

        if let Some(editing) = self.engine.scene.editing_text()
            && hit.element() != Some(editing)
        {
            self.commit_text_edit(editing);
            dirty = true;
        }

        let gesture: Box<dyn Gesture> = match hit {
            HitTarget::Background => Box::new(Pan::new(screen)),
            HitTarget::Node { id } => {
                let Some(visual) = self.engine.scene.node(id) else {
                    return dirty;
                };
                let (drag, pin) = NodeDrag::start(id, Point::new(visual.x, visual.y), screen);
                self.commit(pin);
                Box::new(drag)
            }
            HitTarget::ControlHandle { node, tag } => {
                let Some(visual) = self.engine.scene.node(node) else {
                    return dirty;
                };
                Box::new(ControlPointDrag::new(node, tag, node_transform(visual)))
            }
            HitTarget::RotateHandle { node, direction } => {
                let rotation = &self.engine.config.rotation;
                Box::new(RotateHold::new(
                    node,
                    direction,
                    rotation.step,
                    rotation.interval_ms,
                ))
            }
            HitTarget::LinkControl { id } => Box::new(LinkControlDrag::new(id)),
            // The link body only answers the context menu.
            HitTarget::Link { .. } => return dirty,
            HitTarget::Text { id } => {
                let Some(text) = self.engine.scene.text(id) else {
                    return dirty;
                };
                if text.is_editing() {
                    return dirty;
                }
                Box::new(TextDrag::new(id, Point::new(text.x, text.y), screen))
            }
            HitTarget::TextResize { id } => {
                let Some(text) = self.engine.scene.text(id) else {
                    return dirty;
                };
                Box::new(TextResize::new(
                    id,
                    Size::new(text.width, text.height),
                    screen,
                ))
            }
        };
        log::trace!("{:?} started on {hit:?}", gesture.kind());
        self.gesture = Some(gesture);
        true
    }

    fn double_click(&mut self, screen: Point) -> bool {
        let board = self.engine.screen_to_board(screen);
        match hit_test(&self.engine.scene, board) {
            HitTarget::Text { id } => self.engine.scene.begin_text_edit(id),
            HitTarget::Background => {
                self.commit([BoardMutation::Zoom {
                    factor: DOUBLE_CLICK_ZOOM,
                    anchor: screen,
                }]);
                true
            }
            _ => false,
        }
    }

    fn open_menu(&mut self, screen: Point) -> bool {
        let board = self.engine.screen_to_board(screen);
        let store = &self.engine.store;
        let config = &self.engine.config;
        let hit = hit_test(&self.engine.scene, board);
        let menu = match hit {
            HitTarget::Node { id }
            | HitTarget::ControlHandle { node: id, .. }
            | HitTarget::RotateHandle { node: id, .. } => store
                .node(id)
                .ok()
                .map(|n| ContextMenu::for_node(n, screen, config)),
            HitTarget::Link { id } | HitTarget::LinkControl { id } => store
                .link(id)
                .ok()
                .map(|l| ContextMenu::for_link(l, screen, config)),
            HitTarget::Text { id } | HitTarget::TextResize { id } => store
                .text(id)
                .ok()
                .map(|t| ContextMenu::for_text(t, screen, config)),
            HitTarget::Background => None,
        };
        let changed = menu.is_some() || self.menu.is_some();
        self.menu = menu;
        changed
    }

    fn key(&mut self, key: &str) -> bool {
        match key {
            "n" | "N" if self.engine.scene.editing_text().is_none() => {
                self.toggle_palette();
                true
            }
            "Escape" => self.menu.take().is_some(),
            _ => false,
        }
    }

    /// Apply an action chosen in the open menu.
    pub fn menu_action(&mut self, action: &MenuAction) -> Commit {
        let Some(menu) = &self.menu else {
            log::warn!("menu action {action:?} with no open menu");
            return Commit::default();
        };
        let target = menu.target;
        let at = menu.at;
        let mutations = menu.mutations(action);
        let commit = self.commit(mutations);
        if action.closes_menu() {
            self.menu = None;
        } else {
            self.refresh_menu(target, at);
        }
        commit
    }

    /// Rebuild the open menu so its controls show current values.
    fn refresh_menu(&mut self, target: MenuTarget, at: Point) {
        let store = &self.engine.store;
        let config = &self.engine.config;
        self.menu = match target {
            MenuTarget::Node(id) => store.node(id).ok().map(|n| ContextMenu::for_node(n, at, config)),
            MenuTarget::Link(id) => store.link(id).ok().map(|l| ContextMenu::for_link(l, at, config)),
            MenuTarget::Text(id) => store.text(id).ok().map(|t| ContextMenu::for_text(t, at, config)),
        };
    }

    pub fn begin_text_edit(&mut self, id: ElementId) -> bool {
        self.engine.scene.begin_text_edit(id)
    }

    /// Live keystrokes in the edit box.
    pub fn text_input(&mut self, id: ElementId, value: &str) -> bool {
        self.engine.scene.update_text_draft(id, value)
    }

    /// Focus left the edit box: commit the draft and restore static text.
    pub fn text_blur(&mut self, id: ElementId) -> BoardResult<bool> {
        if self.engine.scene.text(id).is_none() {
            self.engine.store.text(id)?;
        }
        Ok(self.commit_text_edit(id))
    }

    fn commit_text_edit(&mut self, id: ElementId) -> bool {
        match self.engine.scene.end_text_edit(id) {
            Some(text) => {
                self.commit([BoardMutation::SetTextContent { id, text }]);
                true
            }
            None => false,
        }
    }

    /// Frame callback. Advances press-and-hold timers and the layout.
    /// Returns whether the board needs a redraw.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        let elapsed = self
            .last_tick_ms
            .map(|last| (now_ms - last).max(0.0))
            .unwrap_or(0.0);
        self.last_tick_ms = Some(now_ms);

        let mut dirty = self.poll_signals();
        if let Some(gesture) = self.gesture.as_mut() {
            let mutations = gesture.tick(elapsed);
            if !mutations.is_empty() {
                self.commit(mutations);
                dirty = true;
            }
        }
        dirty | self.engine.tick_layout()
    }
}
