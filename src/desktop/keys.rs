//! Keys, modifier sets and typing actions

use enigo::Key;
use std::ops::BitOr;

use super::platform::Platform;
use crate::error::{Error, Result};

/// Most modifiers a single hot-key chord can carry
pub const MAX_CHORD_MODIFIERS: usize = 2;

/// Named keys that can be typed on their own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedKey {
    Space,
    Tab,
    Enter,
    Left,
    Right,
    Up,
    Down,
    Esc,
    Home,
    End,
    Delete,
    Backspace,
    PageUp,
    PageDown,
    Insert,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl ReservedKey {
    pub fn name(self) -> &'static str {
        match self {
            ReservedKey::Space => "space",
            ReservedKey::Tab => "tab",
            ReservedKey::Enter => "enter",
            ReservedKey::Left => "left",
            ReservedKey::Right => "right",
            ReservedKey::Up => "up",
            ReservedKey::Down => "down",
            ReservedKey::Esc => "esc",
            ReservedKey::Home => "home",
            ReservedKey::End => "end",
            ReservedKey::Delete => "del",
            ReservedKey::Backspace => "backspace",
            ReservedKey::PageUp => "pageup",
            ReservedKey::PageDown => "pagedown",
            ReservedKey::Insert => "insert",
            ReservedKey::F1 => "f1",
            ReservedKey::F2 => "f2",
            ReservedKey::F3 => "f3",
            ReservedKey::F4 => "f4",
            ReservedKey::F5 => "f5",
            ReservedKey::F6 => "f6",
            ReservedKey::F7 => "f7",
            ReservedKey::F8 => "f8",
            ReservedKey::F9 => "f9",
            ReservedKey::F10 => "f10",
            ReservedKey::F11 => "f11",
            ReservedKey::F12 => "f12",
        }
    }

    /// Parse a key name (case-insensitive, common aliases accepted)
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "space" | " " => Some(ReservedKey::Space),
            "tab" => Some(ReservedKey::Tab),
            "enter" | "return" => Some(ReservedKey::Enter),
            "left" => Some(ReservedKey::Left),
            "right" => Some(ReservedKey::Right),
            "up" => Some(ReservedKey::Up),
            "down" => Some(ReservedKey::Down),
            "esc" | "escape" => Some(ReservedKey::Esc),
            "home" => Some(ReservedKey::Home),
            "end" => Some(ReservedKey::End),
            "del" | "delete" => Some(ReservedKey::Delete),
            "backspace" | "bs" => Some(ReservedKey::Backspace),
            "pageup" | "pgup" => Some(ReservedKey::PageUp),
            "pagedown" | "pgdn" => Some(ReservedKey::PageDown),
            "insert" | "ins" => Some(ReservedKey::Insert),
            "f1" => Some(ReservedKey::F1),
            "f2" => Some(ReservedKey::F2),
            "f3" => Some(ReservedKey::F3),
            "f4" => Some(ReservedKey::F4),
            "f5" => Some(ReservedKey::F5),
            "f6" => Some(ReservedKey::F6),
            "f7" => Some(ReservedKey::F7),
            "f8" => Some(ReservedKey::F8),
            "f9" => Some(ReservedKey::F9),
            "f10" => Some(ReservedKey::F10),
            "f11" => Some(ReservedKey::F11),
            "f12" => Some(ReservedKey::F12),
            _ => None,
        }
    }

    pub(crate) fn to_enigo(self) -> Key {
        match self {
            ReservedKey::Space => Key::Space,
            ReservedKey::Tab => Key::Tab,
            ReservedKey::Enter => Key::Return,
            ReservedKey::Left => Key::LeftArrow,
            ReservedKey::Right => Key::RightArrow,
            ReservedKey::Up => Key::UpArrow,
            ReservedKey::Down => Key::DownArrow,
            ReservedKey::Esc => Key::Escape,
            ReservedKey::Home => Key::Home,
            ReservedKey::End => Key::End,
            ReservedKey::Delete => Key::Delete,
            ReservedKey::Backspace => Key::Backspace,
            ReservedKey::PageUp => Key::PageUp,
            ReservedKey::PageDown => Key::PageDown,
            ReservedKey::Insert => Key::Insert,
            ReservedKey::F1 => Key::F1,
            ReservedKey::F2 => Key::F2,
            ReservedKey::F3 => Key::F3,
            ReservedKey::F4 => Key::F4,
            ReservedKey::F5 => Key::F5,
            ReservedKey::F6 => Key::F6,
            ReservedKey::F7 => Key::F7,
            ReservedKey::F8 => Key::F8,
            ReservedKey::F9 => Key::F9,
            ReservedKey::F10 => Key::F10,
            ReservedKey::F11 => Key::F11,
            ReservedKey::F12 => Key::F12,
        }
    }
}

/// A single key as the input backend sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Reserved(ReservedKey),
    Char(char),
    Shift,
    Control,
    Alt,
    /// Command on macOS, Windows key elsewhere
    Meta,
}

impl KeyCode {
    /// Resolve a key name or a single character
    pub fn parse(s: &str) -> Result<Self> {
        if let Some(modifier) = Self::from_modifier_name(s) {
            return Ok(modifier);
        }
        if let Some(key) = ReservedKey::from_name(s) {
            return Ok(KeyCode::Reserved(key));
        }
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(KeyCode::Char(c)),
            _ => Err(Error::UnknownKey(s.to_string())),
        }
    }

    fn from_modifier_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "shift" => Some(KeyCode::Shift),
            "ctrl" | "control" => Some(KeyCode::Control),
            "alt" => Some(KeyCode::Alt),
            "win" | "cmd" | "command" | "meta" => Some(KeyCode::Meta),
            _ => None,
        }
    }

    pub(crate) fn to_enigo(self) -> Key {
        match self {
            KeyCode::Reserved(key) => key.to_enigo(),
            KeyCode::Char(c) => Key::Unicode(c),
            KeyCode::Shift => Key::Shift,
            KeyCode::Control => Key::Control,
            KeyCode::Alt => Key::Alt,
            KeyCode::Meta => Key::Meta,
        }
    }
}

impl From<ReservedKey> for KeyCode {
    fn from(key: ReservedKey) -> Self {
        KeyCode::Reserved(key)
    }
}

/// One member of a [`ModifierSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Shift,
    Ctrl,
    Cmd,
    Win,
    Alt,
}

impl Modifier {
    const fn bit(self) -> u8 {
        match self {
            Modifier::Shift => 1 << 0,
            Modifier::Ctrl => 1 << 1,
            Modifier::Cmd => 1 << 2,
            Modifier::Win => 1 << 3,
            Modifier::Alt => 1 << 4,
        }
    }
}

/// Combination of modifiers held during a chord.
///
/// `Cmd` and `Win` are separate members; both resolve to the platform's
/// primary modifier name, so setting both still yields a single name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModifierSet(u8);

impl ModifierSet {
    pub const NONE: Self = Self(0);
    pub const SHIFT: Self = Self(Modifier::Shift.bit());
    pub const CTRL: Self = Self(Modifier::Ctrl.bit());
    pub const CMD: Self = Self(Modifier::Cmd.bit());
    pub const WIN: Self = Self(Modifier::Win.bit());
    pub const ALT: Self = Self(Modifier::Alt.bit());

    pub fn contains(self, modifier: Modifier) -> bool {
        self.0 & modifier.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Platform key names in chord order: shift, ctrl, primary, alt
    pub fn names(self, platform: Platform) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(Modifier::Shift) {
            names.push("shift");
        }
        if self.contains(Modifier::Ctrl) {
            names.push("ctrl");
        }
        if self.contains(Modifier::Cmd) || self.contains(Modifier::Win) {
            names.push(platform.primary_modifier());
        }
        if self.contains(Modifier::Alt) {
            names.push("alt");
        }
        names
    }

    /// Names for a hot-key chord; more than two is not expressible
    pub fn chord_names(self, platform: Platform) -> Result<Vec<&'static str>> {
        let names = self.names(platform);
        if names.is_empty() || names.len() > MAX_CHORD_MODIFIERS {
            return Err(Error::UnsupportedChord(names));
        }
        Ok(names)
    }
}

impl BitOr for ModifierSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl From<Modifier> for ModifierSet {
    fn from(modifier: Modifier) -> Self {
        Self(modifier.bit())
    }
}

/// What `type_action` should synthesize
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeAction {
    /// One named key, pressed and released
    ReservedKey(ReservedKey),
    /// Text typed character by character
    Literal(String),
    /// Hot-key: modifiers held while the final key is pressed
    Chorded(String, ModifierSet),
}

impl TypeAction {
    pub fn literal(text: impl Into<String>) -> Self {
        TypeAction::Literal(text.into())
    }

    pub fn chord(text: impl Into<String>, modifiers: ModifierSet) -> Self {
        TypeAction::Chorded(text.into(), modifiers)
    }
}

impl From<ReservedKey> for TypeAction {
    fn from(key: ReservedKey) -> Self {
        TypeAction::ReservedKey(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_ctrl_is_platform_invariant() {
        let set = ModifierSet::SHIFT | ModifierSet::CTRL;
        for platform in [Platform::Windows, Platform::Linux, Platform::MacOs] {
            assert_eq!(set.chord_names(platform).unwrap(), vec!["shift", "ctrl"]);
        }
    }

    #[test]
    fn test_three_modifiers_is_unsupported() {
        let set = ModifierSet::SHIFT | ModifierSet::CTRL | ModifierSet::ALT;
        match set.chord_names(Platform::Linux) {
            Err(Error::UnsupportedChord(names)) => {
                assert_eq!(names, vec!["shift", "ctrl", "alt"])
            }
            other => panic!("expected UnsupportedChord, got {:?}", other),
        }
    }

    #[test]
    fn test_primary_modifier_resolution() {
        assert_eq!(ModifierSet::CMD.names(Platform::MacOs), vec!["command"]);
        assert_eq!(ModifierSet::CMD.names(Platform::Windows), vec!["win"]);
        assert_eq!(ModifierSet::WIN.names(Platform::MacOs), vec!["command"]);
        // Cmd and Win collapse to one name
        let both = ModifierSet::CMD | ModifierSet::WIN | ModifierSet::ALT;
        assert_eq!(both.chord_names(Platform::Linux).unwrap(), vec!["win", "alt"]);
    }

    #[test]
    fn test_empty_set_is_not_a_chord() {
        assert!(ModifierSet::NONE.chord_names(Platform::Linux).is_err());
    }

    #[test]
    fn test_key_parsing() {
        assert_eq!(KeyCode::parse("a").unwrap(), KeyCode::Char('a'));
        assert_eq!(KeyCode::parse("CTRL").unwrap(), KeyCode::Control);
        assert_eq!(KeyCode::parse("command").unwrap(), KeyCode::Meta);
        assert_eq!(
            KeyCode::parse("Enter").unwrap(),
            KeyCode::Reserved(ReservedKey::Enter)
        );
        assert!(matches!(KeyCode::parse("unknown"), Err(Error::UnknownKey(_))));
    }

    #[test]
    fn test_reserved_names_round_trip() {
        for key in [ReservedKey::Delete, ReservedKey::Esc, ReservedKey::F11] {
            assert_eq!(ReservedKey::from_name(key.name()), Some(key));
        }
    }
}
