//! Board configuration.
//!
//! Every tunable the board uses lives here with its default. The host may
//! override any subset by passing JSON; missing keys keep their defaults.

use crate::error::{BoardError, BoardResult};
use crate::model::{Color, FontSpec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Half-extent the board can be panned over, horizontally and vertically.
    pub extent_width: f64,
    pub extent_height: f64,
    /// Allowed zoom range `[min, max]`.
    pub scale_extent: [f64; 2],
    pub grid: GridConfig,
    pub palette: PaletteConfig,
    pub colors: ColorDefaults,
    pub text: TextDefaults,
    pub rotation: RotationConfig,
    pub positioning: Positioning,
    pub handle_radius: f64,
    pub link_control_radius: f64,
    pub link_stroke_width: f64,
    pub arrow_font_size: f64,
    /// Fallback context-menu size when the host does not report one.
    pub context_menu_size: [f64; 2],
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            extent_width: 10_000.0,
            extent_height: 10_000.0,
            scale_extent: [0.1, 10.0],
            grid: GridConfig::default(),
            palette: PaletteConfig::default(),
            colors: ColorDefaults::default(),
            text: TextDefaults::default(),
            rotation: RotationConfig::default(),
            positioning: Positioning::Manual,
            handle_radius: 5.0,
            link_control_radius: 3.0,
            link_stroke_width: 6.0,
            arrow_font_size: 30.0,
            context_menu_size: [180.0, 200.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub size: f64,
    pub color: Color,
    pub hidden: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: 50.0,
            color: Color::rgb(0xF0, 0xE6, 0x8C),
            hidden: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    /// Fraction of the viewport width covered by the palette. Releasing a
    /// palette drag left of this line cancels creation.
    pub width_ratio: f64,
    pub item_spacing: f64,
    pub item_radius: f64,
    /// Whether the palette starts expanded.
    pub visible: bool,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            width_ratio: 0.1,
            item_spacing: 70.0,
            item_radius: 30.0,
            visible: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorDefaults {
    pub node: Color,
    pub link: Color,
    pub text: Color,
}

impl Default for ColorDefaults {
    fn default() -> Self {
        Self {
            node: Color::LIGHT_BLUE,
            link: Color::LIGHT_BLUE,
            text: Color::WHITE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextDefaults {
    pub content: String,
    pub width: f64,
    pub height: f64,
    pub font: FontSpec,
    pub fonts: Vec<String>,
    pub min_size: f64,
    pub max_size: f64,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            content: "Text".into(),
            width: 100.0,
            height: 50.0,
            font: FontSpec::default(),
            fonts: [
                "Arial",
                "Verdana",
                "Tahoma",
                "Trebuchet MS",
                "Times New Roman",
                "Georgia",
                "Garamond",
            ]
            .map(String::from)
            .to_vec(),
            min_size: 6.0,
            max_size: 32.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Degrees per repeat.
    pub step: f64,
    /// Milliseconds between repeats while a rotation handle is held.
    pub interval_ms: f64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            step: 1.0,
            interval_ms: 16.0,
        }
    }
}

/// How node positions evolve between interactions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Positioning {
    /// Pure direct manipulation: drag pins the node where it is released.
    #[default]
    Manual,
    /// Force-directed layout; dragged nodes are released after the drag.
    Simulated(ForceConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
    /// Many-body strength; negative repels.
    pub charge: f64,
    pub collide_radius: f64,
    pub alpha_min: f64,
    pub alpha_decay: f64,
    pub velocity_decay: f64,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            charge: -20.0,
            collide_radius: 25.0,
            alpha_min: 0.001,
            // d3's default: cool from 1 to alpha_min in ~300 ticks.
            alpha_decay: 1.0 - 0.001_f64.powf(1.0 / 300.0),
            velocity_decay: 0.4,
        }
    }
}

impl BoardConfig {
    /// Parse a (possibly partial) JSON configuration and validate it.
    pub fn from_json(json: &str) -> BoardResult<Self> {
        let config: BoardConfig =
            serde_json::from_str(json).map_err(|e| BoardError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BoardResult<()> {
        let [min, max] = self.scale_extent;
        if !(min > 0.0 && min <= max) {
            return Err(BoardError::InvalidConfig(format!(
                "scale extent must satisfy 0 < min <= max, got [{min}, {max}]"
            )));
        }
        if self.extent_width <= 0.0 || self.extent_height <= 0.0 {
            return Err(BoardError::InvalidConfig("pan extent must be positive".into()));
        }
        if self.grid.size <= 0.0 {
            return Err(BoardError::InvalidConfig("grid size must be positive".into()));
        }
        if self.rotation.interval_ms <= 0.0 {
            return Err(BoardError::InvalidConfig(
                "rotation interval must be positive".into(),
            ));
        }
        if self.text.min_size > self.text.max_size {
            return Err(BoardError::InvalidConfig("font size range is empty".into()));
        }
        Ok(())
    }

    /// Clamp a requested font size into the allowed range.
    pub fn clamp_font_size(&self, size: f64) -> f64 {
        size.round().clamp(self.text.min_size, self.text.max_size)
    }
}
