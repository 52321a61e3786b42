// Keyhook Modifier System
// Modifier categories (Shift, Ctrl, Alt, Meta) and held-modifier sets

use std::fmt;

use crate::Key;

/// A canonical modifier category.
///
/// Left and right physical keys collapse into one category: both shift keys
/// are `Shift`, both Windows/Super keys are `Meta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Modifier {
    Control = 0,
    Shift = 1,
    Alt = 2,
    Meta = 3,
}

impl Modifier {
    /// All categories in display order
    pub const ALL: [Modifier; 4] = [
        Modifier::Control,
        Modifier::Shift,
        Modifier::Alt,
        Modifier::Meta,
    ];

    /// Get the primary alias (string representation)
    pub fn primary_alias(self) -> &'static str {
        match self {
            Modifier::Control => "Ctrl",
            Modifier::Shift => "Shift",
            Modifier::Alt => "Alt",
            Modifier::Meta => "Meta",
        }
    }

    /// Get modifier by alias (case-insensitive)
    pub fn from_alias(alias: &str) -> Option<Modifier> {
        match alias.trim().to_ascii_lowercase().as_str() {
            "ctrl" | "control" | "c" => Some(Modifier::Control),
            "shift" => Some(Modifier::Shift),
            "alt" | "opt" | "option" | "a" => Some(Modifier::Alt),
            "meta" | "super" | "win" | "windows" | "cmd" | "command" => Some(Modifier::Meta),
            _ => None,
        }
    }

    /// Get the modifier category of a key, if it is a modifier key
    pub fn from_key(key: Key) -> Option<Modifier> {
        classify(key)
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.primary_alias())
    }
}

/// Classify a Linux evdev key code.
pub const fn classify_evdev(code: u16) -> Option<Modifier> {
    match code {
        42 | 54 => Some(Modifier::Shift),
        29 | 97 => Some(Modifier::Control),
        56 | 100 => Some(Modifier::Alt),
        125 | 126 => Some(Modifier::Meta),
        _ => None,
    }
}

/// Classify a Win32 virtual-key code.
///
/// The low-level hook reports sided codes, but the generic VK_SHIFT,
/// VK_CONTROL and VK_MENU codes are also accepted.
pub const fn classify_vk(code: u16) -> Option<Modifier> {
    match code {
        0x10 | 0xA0 | 0xA1 => Some(Modifier::Shift),
        0x11 | 0xA2 | 0xA3 => Some(Modifier::Control),
        0x12 | 0xA4 | 0xA5 => Some(Modifier::Alt),
        0x5B | 0x5C => Some(Modifier::Meta),
        _ => None,
    }
}

/// Map a raw key to its modifier category in the native code space.
#[inline]
pub const fn classify(key: Key) -> Option<Modifier> {
    if cfg!(windows) {
        classify_vk(key.code())
    } else {
        classify_evdev(key.code())
    }
}

/// Set of modifier categories.
///
/// Stored as a bitmask, so construction order never matters and equality is
/// exact set equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModifierSet(u8);

impl ModifierSet {
    /// The empty set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Return a copy of this set with `modifier` added
    pub const fn with(self, modifier: Modifier) -> Self {
        Self(self.0 | modifier.bit())
    }

    pub fn insert(&mut self, modifier: Modifier) {
        self.0 |= modifier.bit();
    }

    pub fn remove(&mut self, modifier: Modifier) {
        self.0 &= !modifier.bit();
    }

    pub const fn contains(self, modifier: Modifier) -> bool {
        self.0 & modifier.bit() != 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the members in display order
    pub fn iter(self) -> impl Iterator<Item = Modifier> {
        Modifier::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

impl From<Modifier> for ModifierSet {
    fn from(modifier: Modifier) -> Self {
        Self::empty().with(modifier)
    }
}

impl<const N: usize> From<[Modifier; N]> for ModifierSet {
    fn from(modifiers: [Modifier; N]) -> Self {
        modifiers.into_iter().collect()
    }
}

impl From<&[Modifier]> for ModifierSet {
    fn from(modifiers: &[Modifier]) -> Self {
        modifiers.iter().copied().collect()
    }
}

impl FromIterator<Modifier> for ModifierSet {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        let mut set = Self::empty();
        for modifier in iter {
            set.insert(modifier);
        }
        set
    }
}

impl fmt::Debug for ModifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for ModifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.iter().map(Modifier::primary_alias).collect();
        write!(f, "{}", parts.join("+"))
    }
}
