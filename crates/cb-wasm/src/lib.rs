//! WASM bridge for Chart Board: exposes the board controller to the
//! browser host.
//!
//! Compiled via `wasm-pack build --target web`. The host forwards DOM
//! events, mounts the SVG returned by `render_svg`, and draws the context
//! menu from `menu_json`. Structured results are JSON strings.

mod console;

use cb_core::{BoardConfig, ElementId, Size};
use cb_core::palette::PaletteItem;
use cb_editor::{BoardController, Commit, GridToggleSender, InputEvent, MenuAction, PointerButton};
use cb_render::ReconcileReport;
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// `{"ok":true,..}` result of a menu action.
#[derive(Serialize)]
struct CommitResult<'a> {
    ok: bool,
    created: &'a [ElementId],
    rejected: usize,
    report: &'a ReconcileReport,
}

#[derive(Serialize)]
struct BlurResult {
    ok: bool,
    committed: bool,
}

#[derive(Serialize)]
struct ErrorResult {
    ok: bool,
    error: String,
}

#[derive(Serialize)]
struct PaletteSlot<'a> {
    item: &'a PaletteItem,
    x: f64,
    y: f64,
}

#[derive(Serialize)]
struct PaletteView<'a> {
    visible: bool,
    entries: Vec<PaletteSlot<'a>>,
}

/// The main WASM-facing board.
#[wasm_bindgen]
pub struct BoardCanvas {
    controller: BoardController,
}

/// Handle the navigation control keeps to toggle the grid.
#[wasm_bindgen]
pub struct GridSignal {
    sender: GridToggleSender,
}

#[wasm_bindgen]
impl GridSignal {
    /// Fire the toggle. Returns false once the board is gone.
    pub fn toggle(&self) -> bool {
        self.sender.toggle_grid()
    }
}

#[wasm_bindgen]
impl BoardCanvas {
    /// Create a board. `config_json` may override any subset of the
    /// defaults; `log_level` is a `log` level name.
    #[wasm_bindgen(constructor)]
    pub fn new(
        width: f64,
        height: f64,
        config_json: Option<String>,
        log_level: Option<String>,
    ) -> Result<BoardCanvas, JsValue> {
        console::panic_hook_setup();
        #[cfg(target_arch = "wasm32")]
        console::init(console::parse_level(log_level.as_deref().unwrap_or("warn")));
        #[cfg(not(target_arch = "wasm32"))]
        let _ = log_level;

        let config = parse_config(config_json.as_deref())
            .map_err(|e| JsValue::from_str(&e))?;
        log::info!("board created at {width}x{height}");
        Ok(Self {
            controller: BoardController::new(config, Size::new(width, height)),
        })
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.controller.resize(Size::new(width, height));
    }

    // ─── Input ───────────────────────────────────────────────────────────
    // Each handler returns whether the board needs a redraw.

    pub fn handle_pointer_down(&mut self, x: f64, y: f64, button: i16) -> bool {
        self.controller.handle(&InputEvent::PointerDown {
            x,
            y,
            button: PointerButton::from_dom(button),
        })
    }

    pub fn handle_pointer_move(&mut self, x: f64, y: f64) -> bool {
        self.controller.handle(&InputEvent::PointerMove { x, y })
    }

    pub fn handle_pointer_up(&mut self, x: f64, y: f64) -> bool {
        self.controller.handle(&InputEvent::PointerUp { x, y })
    }

    pub fn handle_pointer_leave(&mut self) -> bool {
        self.controller.handle(&InputEvent::PointerLeave)
    }

    pub fn handle_wheel(&mut self, x: f64, y: f64, delta_y: f64) -> bool {
        self.controller.handle(&InputEvent::Wheel { x, y, delta_y })
    }

    pub fn handle_double_click(&mut self, x: f64, y: f64) -> bool {
        self.controller.handle(&InputEvent::DoubleClick { x, y })
    }

    pub fn handle_context_menu(&mut self, x: f64, y: f64) -> bool {
        self.controller.handle(&InputEvent::ContextMenu { x, y })
    }

    pub fn handle_key(&mut self, key: &str) -> bool {
        self.controller.handle(&InputEvent::Key {
            key: key.to_string(),
        })
    }

    /// Animation-frame callback with `performance.now()`.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.controller.tick(now_ms)
    }

    /// `tick` against the wall clock, for hosts driving the board from a
    /// plain interval.
    pub fn tick_now(&mut self) -> bool {
        self.controller.tick(js_sys::Date::now())
    }

    // ─── Menus & text ────────────────────────────────────────────────────

    /// Apply a menu action, e.g. `{"action":"changeColor","color":"#FF0000"}`.
    /// Returns `{"ok":true,"created":[...]}` or `{"ok":false,"error":"..."}`.
    pub fn menu_action(&mut self, action_json: &str) -> String {
        match serde_json::from_str::<MenuAction>(action_json) {
            Ok(action) => commit_json(&self.controller.menu_action(&action)),
            Err(e) => error_json(&e),
        }
    }

    pub fn toggle_palette(&mut self) -> bool {
        self.controller.toggle_palette()
    }

    // Host ids are looked up, never interned: an id the board never
    // issued cannot name an element.

    pub fn begin_text_edit(&mut self, id: &str) -> bool {
        ElementId::get(id).is_some_and(|id| self.controller.begin_text_edit(id))
    }

    pub fn text_input(&mut self, id: &str, value: &str) -> bool {
        ElementId::get(id).is_some_and(|id| self.controller.text_input(id, value))
    }

    /// Commit the edit box on focus loss. Returns `{"ok":true,"committed":bool}`.
    pub fn text_blur(&mut self, id: &str) -> String {
        let Some(element) = ElementId::get(id) else {
            log::warn!("text blur for unknown id {id}");
            return error_json(&format!("text block not found: {id}"));
        };
        match self.controller.text_blur(element) {
            Ok(committed) => to_json(&BlurResult {
                ok: true,
                committed,
            }),
            Err(e) => error_json(&e),
        }
    }

    pub fn grid_signal(&self) -> GridSignal {
        GridSignal {
            sender: self.controller.grid_signal(),
        }
    }

    // ─── Output ──────────────────────────────────────────────────────────

    pub fn render_svg(&self) -> String {
        self.controller.render_svg()
    }

    /// The open context menu, or `null`.
    pub fn menu_json(&self) -> String {
        serde_json::to_string(&self.controller.menu()).unwrap_or_else(|_| "null".to_string())
    }

    pub fn palette_json(&self) -> String {
        let entries = self
            .controller
            .palette()
            .iter()
            .map(|e| PaletteSlot {
                item: &e.item,
                x: e.at.x,
                y: e.at.y,
            })
            .collect();
        to_json(&PaletteView {
            visible: self.controller.palette_visible(),
            entries,
        })
    }

    pub fn selection_json(&self) -> String {
        serde_json::to_string(self.controller.engine().store.selection())
            .unwrap_or_else(|_| "[]".to_string())
    }

    pub fn view_json(&self) -> String {
        to_json(self.controller.engine().view())
    }
}

fn parse_config(json: Option<&str>) -> Result<BoardConfig, String> {
    match json.map(str::trim) {
        None | Some("") => Ok(BoardConfig::default()),
        Some(json) => BoardConfig::from_json(json).map_err(|e| e.to_string()),
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        log::error!("result serialization failed: {e}");
        "null".to_string()
    })
}

fn commit_json(commit: &Commit) -> String {
    to_json(&CommitResult {
        ok: true,
        created: &commit.created,
        rejected: commit.rejected,
        report: &commit.report,
    })
}

fn error_json(e: &dyn std::fmt::Display) -> String {
    to_json(&ErrorResult {
        ok: false,
        error: e.to_string(),
    })
}
