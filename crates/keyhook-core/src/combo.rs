// Keyhook Combo Type
// Represents a hotkey: one key plus the modifiers held before it

use std::fmt;
use std::str::FromStr;

use crate::config::{parse_combo_string, ComboParseError};
use crate::modifier::{Modifier, ModifierSet};
use crate::Key;

/// A key combination with an unordered set of modifiers.
///
/// Two combos are equal only when the key matches and the modifier sets are
/// identical; `Ctrl+Shift+K` does not match `Ctrl+K`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Combo {
    modifiers: ModifierSet,
    key: Key,
}

impl Combo {
    /// Create a new Combo from modifiers and a key
    pub fn new(modifiers: impl Into<ModifierSet>, key: Key) -> Self {
        Self {
            modifiers: modifiers.into(),
            key,
        }
    }

    /// Create a Combo with no modifiers
    pub const fn bare(key: Key) -> Self {
        Self {
            modifiers: ModifierSet::empty(),
            key,
        }
    }

    /// Get the modifiers for this combo
    pub fn modifiers(&self) -> ModifierSet {
        self.modifiers
    }

    /// Get the key for this combo
    pub fn key(&self) -> Key {
        self.key
    }

    /// Return a copy with one more modifier
    pub fn with_modifier(&self, modifier: Modifier) -> Self {
        Self {
            modifiers: self.modifiers.with(modifier),
            key: self.key,
        }
    }
}

impl From<Key> for Combo {
    fn from(key: Key) -> Self {
        Combo::bare(key)
    }
}

impl<M: Into<ModifierSet>> From<(M, Key)> for Combo {
    fn from((modifiers, key): (M, Key)) -> Self {
        Combo::new(modifiers, key)
    }
}

impl FromStr for Combo {
    type Err = ComboParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_combo_string(s)
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}+{}", self.modifiers, self.key)
        }
    }
}
