//! Keybinding types: key triggers, modifier masks and the action set.

use bitflags::bitflags;

use crate::ScriptRef;

bitflags! {
    /// Keyboard modifier mask, matching the compositor's modifier bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers : u8 {
        const SHIFT = 1;
        const CAPS = 1 << 1;
        const CTRL = 1 << 2;
        const ALT = 1 << 3;
        const MOD2 = 1 << 4;
        const MOD3 = 1 << 5;
        const SUPER = 1 << 6;
        const MOD5 = 1 << 7;
    }
}

impl Modifiers {
    /// Parses a single modifier name as written in the config file.
    pub fn from_modifier_name(name: &str) -> Option<Modifiers> {
        match name {
            "shift" => Some(Modifiers::SHIFT),
            "caps" => Some(Modifiers::CAPS),
            "ctrl" => Some(Modifiers::CTRL),
            "alt" => Some(Modifiers::ALT),
            "mod2" => Some(Modifiers::MOD2),
            "mod3" => Some(Modifiers::MOD3),
            "super" => Some(Modifiers::SUPER),
            "mod5" => Some(Modifiers::MOD5),
            _ => None,
        }
    }
}

/// An X keysym. The config source resolves key names to keysyms; the core
/// only ever compares them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keysym(pub u32);

/// A modifier combination plus a keysym.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub modifiers: Modifiers,
    pub keysym: Keysym,
}

/// Direction for focus, move and resize operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn from_name(name: &str) -> Option<Direction> {
        match name {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

/// Forward/backward cycling through views or workspaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDirection {
    Next,
    Previous,
}

/// Which way a leaf frame is split in two.
///
/// `Right` splits the horizontal axis (the new empty frame appears on the
/// right), `Down` splits the vertical axis (it appears at the bottom).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitSide {
    Right,
    Down,
}

/// An operation a key can be bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Spawn(Vec<String>),
    ScriptCall(ScriptRef),
    Exit,
    CloseView,
    CycleTilingMode,
    CycleView(CycleDirection),
    Select(Direction),
    Move(Direction),
    NewFrame(SplitSide),
    DeleteFrame,
    Resize(Direction, f64),
    CycleWorkspace(CycleDirection),
    SelectWorkspace(u32),
    MoveToWorkspace(u32),
    AddWorkspace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bind {
    pub key: Key,
    pub action: Action,
}

/// The configured keybinding list, in registration order. A later bind for
/// the same key overrides an earlier one when the dispatcher builds its
/// lookup table.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Binds(pub Vec<Bind>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_names_map_to_bits() {
        let mods = Modifiers::from_modifier_name("super").unwrap()
            | Modifiers::from_modifier_name("shift").unwrap();
        assert_eq!(mods, Modifiers::SUPER | Modifiers::SHIFT);
        assert_eq!(Modifiers::from_modifier_name("hyper"), None);
    }

    #[test]
    fn direction_opposites() {
        for dir in [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ] {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_ne!(dir.is_horizontal(), dir.is_vertical());
        }
    }
}
