// Keyhook Config - Combo String Parser
// Parses combo strings like "Ctrl+Shift+K" into a Combo

use crate::key::key_from_name;
use crate::{Combo, Modifier, ModifierSet};

/// Errors that can occur during combo parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComboParseError {
    #[error("combo string cannot be empty")]
    EmptyInput,

    #[error("unknown key name: '{0}'")]
    UnknownKey(String),

    #[error("unknown modifier: '{0}'")]
    UnknownModifier(String),

    #[error("combo string cannot end with '+'")]
    TrailingSeparator,
}

/// Parse a combo string like "Ctrl+Shift+K".
///
/// Every component but the last must be a modifier alias; the last is the
/// key name. Matching is case-insensitive and repeated modifiers collapse.
///
/// # Examples
/// ```
/// use keyhook_core::config::parse_combo_string;
/// use keyhook_core::{Combo, Key, Modifier};
/// let combo = parse_combo_string("ctrl+shift+k").unwrap();
/// assert_eq!(combo, Combo::new([Modifier::Control, Modifier::Shift], Key::K));
/// ```
pub fn parse_combo_string(exp: &str) -> Result<Combo, ComboParseError> {
    let trimmed = exp.trim();
    if trimmed.is_empty() {
        return Err(ComboParseError::EmptyInput);
    }
    if trimmed.ends_with('+') {
        return Err(ComboParseError::TrailingSeparator);
    }

    let parts: Vec<&str> = trimmed.split('+').map(str::trim).collect();
    let (key_str, modifier_strs) = match parts.split_last() {
        Some(split) => split,
        None => return Err(ComboParseError::EmptyInput),
    };

    let key = key_from_name(key_str).ok_or_else(|| ComboParseError::UnknownKey(key_str.to_string()))?;

    let modifiers = modifier_strs
        .iter()
        .map(|part| {
            Modifier::from_alias(part).ok_or_else(|| ComboParseError::UnknownModifier(part.to_string()))
        })
        .collect::<Result<ModifierSet, _>>()?;

    Ok(Combo::new(modifiers, key))
}
