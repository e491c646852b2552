pub mod controller;
pub mod input;
pub mod menu;
pub mod signal;
pub mod sync;
pub mod tools;

pub use controller::BoardController;
pub use input::{InputEvent, PointerButton};
pub use menu::{ContextMenu, MenuAction, MenuControl, MenuEntry, MenuTarget};
pub use signal::{GridToggleReceiver, GridToggleSender, menu_signal};
pub use sync::{BoardEngine, BoardMutation, Commit};
pub use tools::{Gesture, GestureKind};
