//! Per-element context menus.
//!
//! The menu is plain data: the host draws the entries and reports the
//! chosen `MenuAction` back. `ContextMenu::mutations` turns an action into
//! board mutations for the element the menu was opened on.

use crate::sync::BoardMutation;
use cb_core::{BoardConfig, Color, ElementId, Link, Rect, ShapeNode, TextBlock};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum MenuTarget {
    Node(ElementId),
    Link(ElementId),
    Text(ElementId),
}

/// What the user picked in a menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum MenuAction {
    LinkItems,
    RemoveNode,
    ChangeLinkType,
    ToggleArrows,
    ReverseArrows,
    AdjustArrowColor,
    RemoveLink,
    RemoveText,
    ChangeColor { color: Color },
    SetFontFamily { family: String },
    SetFontSize { size: f64 },
}

impl MenuAction {
    /// Buttons close the menu; value controls keep it open.
    pub fn closes_menu(&self) -> bool {
        !matches!(
            self,
            MenuAction::ChangeColor { .. }
                | MenuAction::SetFontFamily { .. }
                | MenuAction::SetFontSize { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "control", rename_all = "camelCase")]
pub enum MenuControl {
    Button { action: MenuAction },
    ColorInput { value: Color },
    FontSelect { options: Vec<String>, value: String },
    SizeRange { min: f64, max: f64, step: f64, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuEntry {
    pub label: String,
    #[serde(flatten)]
    pub control: MenuControl,
}

impl MenuEntry {
    fn button(label: &str, action: MenuAction) -> Self {
        Self {
            label: label.to_string(),
            control: MenuControl::Button { action },
        }
    }

    fn color(value: Color) -> Self {
        Self {
            label: "Change Colour".to_string(),
            control: MenuControl::ColorInput { value },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextMenu {
    pub target: MenuTarget,
    /// Top-left corner, screen space.
    pub at: Point,
    pub size: Size,
    pub entries: Vec<MenuEntry>,
}

impl ContextMenu {
    fn new(target: MenuTarget, at: Point, config: &BoardConfig, entries: Vec<MenuEntry>) -> Self {
        let [w, h] = config.context_menu_size;
        Self {
            target,
            at,
            size: Size::new(w, h),
            entries,
        }
    }

    pub fn for_node(node: &ShapeNode, at: Point, config: &BoardConfig) -> Self {
        let entries = vec![
            MenuEntry::button("Link Items", MenuAction::LinkItems),
            MenuEntry::color(node.color),
            MenuEntry::button("Remove Node", MenuAction::RemoveNode),
        ];
        Self::new(MenuTarget::Node(node.id), at, config, entries)
    }

    pub fn for_link(link: &Link, at: Point, config: &BoardConfig) -> Self {
        let arrows = if link.arrows {
            "Remove Arrows"
        } else {
            "Add Arrows"
        };
        let entries = vec![
            MenuEntry::button("Change Link Type", MenuAction::ChangeLinkType),
            MenuEntry::button(arrows, MenuAction::ToggleArrows),
            MenuEntry::button("Reverse Arrows", MenuAction::ReverseArrows),
            MenuEntry::button("Adjust Arrow Colour", MenuAction::AdjustArrowColor),
            MenuEntry::color(link.color),
            MenuEntry::button("Remove Link", MenuAction::RemoveLink),
        ];
        Self::new(MenuTarget::Link(link.id), at, config, entries)
    }

    pub fn for_text(text: &TextBlock, at: Point, config: &BoardConfig) -> Self {
        let entries = vec![
            MenuEntry {
                label: "Font".to_string(),
                control: MenuControl::FontSelect {
                    options: config.text.fonts.clone(),
                    value: text.font.family.clone(),
                },
            },
            MenuEntry {
                label: "Size".to_string(),
                control: MenuControl::SizeRange {
                    min: config.text.min_size,
                    max: config.text.max_size,
                    step: 1.0,
                    value: text.font.size,
                },
            },
            MenuEntry::color(text.color),
            MenuEntry::button("Remove Text", MenuAction::RemoveText),
        ];
        Self::new(MenuTarget::Text(text.id), at, config, entries)
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.at, self.size)
    }

    /// Whether a screen point falls inside the menu. Presses outside
    /// dismiss it.
    pub fn contains(&self, p: Point) -> bool {
        let b = self.bounds();
        p.x >= b.x0 && p.x <= b.x1 && p.y >= b.y0 && p.y <= b.y1
    }

    /// Translate an action into mutations for this menu's element. An
    /// action that does not belong to the element's kind yields nothing.
    pub fn mutations(&self, action: &MenuAction) -> SmallVec<[BoardMutation; 1]> {
        use MenuAction as A;
        use MenuTarget as T;
        let mutation = match (self.target, action) {
            (T::Node(invoker), A::LinkItems) => BoardMutation::LinkSelection { invoker },
            (T::Node(id), A::RemoveNode) => BoardMutation::RemoveNode { id },
            (T::Node(id), A::ChangeColor { color }) => BoardMutation::SetNodeColor {
                id,
                color: *color,
            },
            (T::Link(id), A::ChangeLinkType) => BoardMutation::ToggleLinkStyle { id },
            (T::Link(id), A::ToggleArrows) => BoardMutation::ToggleArrows { id },
            (T::Link(id), A::ReverseArrows) => BoardMutation::ReverseArrows { id },
            (T::Link(id), A::AdjustArrowColor) => BoardMutation::RefreshArrowColors { id },
            (T::Link(id), A::RemoveLink) => BoardMutation::RemoveLink { id },
            (T::Link(id), A::ChangeColor { color }) => BoardMutation::SetLinkColor {
                id,
                color: *color,
            },
            (T::Text(id), A::RemoveText) => BoardMutation::RemoveText { id },
            (T::Text(id), A::ChangeColor { color }) => BoardMutation::SetTextColor {
                id,
                color: *color,
            },
            (T::Text(id), A::SetFontFamily { family }) => BoardMutation::SetFontFamily {
                id,
                family: family.clone(),
            },
            (T::Text(id), A::SetFontSize { size }) => BoardMutation::SetFontSize { id, size: *size },
            (target, action) => {
                log::warn!("menu action {action:?} does not apply to {target:?}");
                return SmallVec::new();
            }
        };
        smallvec![mutation]
    }
}
