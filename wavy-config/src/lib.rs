//! Configuration data model for the wavy layout core.
//!
//! The embedded scripting layer (the config source) evaluates the user's
//! config file and produces a static [`Config`] value; everything in this
//! crate is plain data. Callbacks registered by the script (statusbar
//! widgets, `script_call` keybindings) are referenced through opaque
//! [`ScriptRef`] handles that only the script host can resolve.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

mod binds;

pub use binds::{Action, Bind, Binds, CycleDirection, Direction, Key, Keysym, Modifiers, SplitSide};

/// A `0xRRGGBBAA` packed color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const TRANSPARENT: Color = Color(0);

    pub fn r(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn g(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn b(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn a(self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08x}", self.0)
    }
}

/// One of the built-in tiling policies of a leaf frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileLayout {
    Vertical,
    Horizontal,
    Grid,
    Fullscreen,
    Fibonacci,
}

impl TileLayout {
    /// All five policies in their default cycle order.
    pub const ALL: [TileLayout; 5] = [
        TileLayout::Vertical,
        TileLayout::Horizontal,
        TileLayout::Grid,
        TileLayout::Fullscreen,
        TileLayout::Fibonacci,
    ];

    pub fn from_name(name: &str) -> Option<TileLayout> {
        match name {
            "vertical" => Some(TileLayout::Vertical),
            "horizontal" => Some(TileLayout::Horizontal),
            "grid" => Some(TileLayout::Grid),
            "fullscreen" => Some(TileLayout::Fullscreen),
            "fibonacci" => Some(TileLayout::Fibonacci),
            _ => None,
        }
    }
}

/// Statusbar placement on an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Top,
    Bottom,
}

/// Which edge of the statusbar a widget is laid out from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// Event class a statusbar widget subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hook {
    /// Fired roughly once per second.
    PeriodicFast,
    /// Fired roughly every thirty seconds.
    PeriodicSlow,
    /// Fired by the layout manager after any tree mutation.
    ViewUpdate,
    /// Fired explicitly from a user script.
    User,
}

impl Hook {
    pub const ALL: [Hook; 4] = [
        Hook::PeriodicFast,
        Hook::PeriodicSlow,
        Hook::ViewUpdate,
        Hook::User,
    ];

    pub fn from_name(name: &str) -> Option<Hook> {
        match name {
            "hook_periodic_fast" => Some(Hook::PeriodicFast),
            "hook_periodic_slow" => Some(Hook::PeriodicSlow),
            "hook_view_update" => Some(Hook::ViewUpdate),
            "hook_user" => Some(Hook::User),
            _ => None,
        }
    }
}

/// Handle to a callback registered in the script host's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptRef(pub u32);

/// A statusbar widget registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetSpec {
    pub side: Side,
    pub hook: Hook,
    pub callback: ScriptRef,
}

/// Per-device input configuration, passed through to libinput by the
/// backend. The core never interprets the option values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputConfig {
    pub name: String,
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("tile_layouts must name at least one layout")]
    EmptyTileLayouts,
    #[error("statusbar_height must be non-zero")]
    ZeroBarHeight,
}

/// The full configuration produced by the config source at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub frame_gaps_size: u32,
    pub frame_border_size: u32,
    pub frame_border_empty_size: u32,
    pub frame_border_active_color: Color,
    pub frame_border_inactive_color: Color,
    pub frame_border_empty_active_color: Color,
    pub frame_border_empty_inactive_color: Color,

    pub view_border_size: u32,
    pub view_border_active_color: Color,
    pub view_border_inactive_color: Color,

    pub statusbar_height: u32,
    pub statusbar_font: String,
    pub statusbar_gap: u32,
    pub statusbar_padding: u32,
    pub statusbar_position: Position,
    pub statusbar_bg_color: Color,
    pub statusbar_active_ws_color: Color,
    pub statusbar_inactive_ws_color: Color,
    pub statusbar_active_ws_font_color: Color,
    pub statusbar_inactive_ws_font_color: Color,
    pub statusbar_separator_enabled: bool,
    pub statusbar_separator_color: Color,
    pub statusbar_separator_width: u32,

    /// The tiling-mode cycle; leaf frames store an index into this list.
    pub tile_layouts: Vec<TileLayout>,

    /// Command lines spawned once the compositor is ready.
    pub autostart: Vec<Vec<String>>,

    pub input: Vec<InputConfig>,
    pub keys: Binds,
    pub bar_widgets: Vec<WidgetSpec>,
    pub wallpaper: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame_gaps_size: 5,
            frame_border_size: 0,
            frame_border_empty_size: 3,
            frame_border_active_color: Color(0x475b74ff),
            frame_border_inactive_color: Color(0x475b74ff),
            frame_border_empty_active_color: Color(0x0c1cffff),
            frame_border_empty_inactive_color: Color(0x6b6c7fff),

            view_border_size: 2,
            view_border_active_color: Color(0x4897cfff),
            view_border_inactive_color: Color(0x475b74ff),

            statusbar_height: 17,
            statusbar_font: String::from("monospace 10"),
            statusbar_gap: 4,
            statusbar_padding: 10,
            statusbar_position: Position::Top,
            statusbar_bg_color: Color(0x282828ff),
            statusbar_active_ws_color: Color(0x70407fff),
            statusbar_inactive_ws_color: Color(0x404055ff),
            statusbar_active_ws_font_color: Color(0xffffffff),
            statusbar_inactive_ws_font_color: Color(0xccccccff),
            statusbar_separator_enabled: false,
            statusbar_separator_color: Color(0x2d95efff),
            statusbar_separator_width: 1,

            tile_layouts: TileLayout::ALL.to_vec(),
            autostart: Vec::new(),
            input: Vec::new(),
            keys: Binds::default(),
            bar_widgets: Vec::new(),
            wallpaper: None,
        }
    }
}

impl Config {
    /// Checks the constraints the layout core relies on. The config source
    /// is expected to call this before handing the value over; the core
    /// aborts at init otherwise.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_layouts.is_empty() {
            return Err(ConfigError::EmptyTileLayouts);
        }
        if self.statusbar_height == 0 {
            return Err(ConfigError::ZeroBarHeight);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn color_channels_unpack_big_endian() {
        let c = Color(0x4897cfff);
        assert_eq!(c.r(), 0x48);
        assert_eq!(c.g(), 0x97);
        assert_eq!(c.b(), 0xcf);
        assert_eq!(c.a(), 0xff);
        assert_eq!(c.to_string(), "#4897cfff");
    }

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.tile_layouts, TileLayout::ALL.to_vec());
        assert_eq!(config.statusbar_position, Position::Top);
    }

    #[test]
    fn empty_layout_cycle_is_rejected() {
        let config = Config {
            tile_layouts: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyTileLayouts)
        ));
    }

    #[test]
    fn layout_and_hook_names_round_trip() {
        for layout in TileLayout::ALL {
            let name = match layout {
                TileLayout::Vertical => "vertical",
                TileLayout::Horizontal => "horizontal",
                TileLayout::Grid => "grid",
                TileLayout::Fullscreen => "fullscreen",
                TileLayout::Fibonacci => "fibonacci",
            };
            assert_eq!(TileLayout::from_name(name), Some(layout));
        }
        assert_eq!(TileLayout::from_name("spiral"), None);
        assert_eq!(Hook::from_name("hook_user"), Some(Hook::User));
        assert_eq!(Hook::from_name("hook_unknown"), None);
    }
}
