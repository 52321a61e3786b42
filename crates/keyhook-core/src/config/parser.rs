// Keyhook Config Parser - TOML with Serde
// Loads hotkey bindings, dispatcher and device settings

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::combo_parser::{parse_combo_string, ComboParseError};
use crate::dispatch::DEFAULT_WORKERS;
use crate::Combo;

/// Configuration parser errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid combo in hotkey #{index} ('{keys}'): {source}")]
    InvalidCombo {
        index: usize,
        keys: String,
        source: ComboParseError,
    },

    #[error("Hotkey {0} is defined more than once")]
    DuplicateHotkey(Combo),

    #[error("dispatch.workers must be at least 1")]
    NoWorkers,
}

/// Root TOML table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    #[serde(default)]
    dispatch: Option<DispatchToml>,

    #[serde(default)]
    hook: Option<HookToml>,

    #[serde(default)]
    hotkey: Vec<HotkeyToml>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct DispatchToml {
    workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct HookToml {
    #[serde(default)]
    devices: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct HotkeyToml {
    keys: String,
    #[serde(default)]
    blocking: bool,
    #[serde(default)]
    message: Option<String>,
}

/// One configured hotkey
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyEntry {
    pub combo: Combo,
    pub blocking: bool,
    pub message: Option<String>,
}

/// Parsed configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of dispatch worker threads
    pub workers: usize,
    /// evdev device names/paths to hook (empty = autodetect)
    pub devices: Vec<String>,
    /// Hotkeys in file order
    pub hotkeys: Vec<HotkeyEntry>,
    /// Path the config was loaded from
    pub source_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            devices: Vec::new(),
            hotkeys: Vec::new(),
            source_path: None,
        }
    }
}

impl Config {
    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let raw: ConfigToml =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;

        let workers = raw
            .dispatch
            .and_then(|d| d.workers)
            .unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            return Err(ConfigError::NoWorkers);
        }

        let devices = raw.hook.map(|h| h.devices).unwrap_or_default();

        let mut seen = HashSet::new();
        let mut hotkeys = Vec::with_capacity(raw.hotkey.len());
        for (index, entry) in raw.hotkey.into_iter().enumerate() {
            let combo = parse_combo_string(&entry.keys).map_err(|source| ConfigError::InvalidCombo {
                index,
                keys: entry.keys.clone(),
                source,
            })?;
            if !seen.insert(combo) {
                return Err(ConfigError::DuplicateHotkey(combo));
            }
            log::trace!("Config hotkey #{}: {} (blocking={})", index, combo, entry.blocking);
            hotkeys.push(HotkeyEntry {
                combo,
                blocking: entry.blocking,
                message: entry.message,
            });
        }

        Ok(Self {
            workers,
            devices,
            hotkeys,
            source_path: None,
        })
    }

    /// Load configuration from a TOML file
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path)?;
        let mut config = Self::from_toml(&content)?;
        config.source_path = Some(path.as_ref().to_path_buf());
        log::debug!(
            "Loaded {} hotkey(s) from {}",
            config.hotkeys.len(),
            path.as_ref().display()
        );
        Ok(config)
    }

    /// Get the default config path (~/.config/keyhook/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("keyhook").join("config.toml"))
    }

    /// Load from the default location, falling back to defaults when the
    /// file does not exist
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_toml_path(path);
            }
        }
        Ok(Self::default())
    }
}

/// Starter config written for new installations
pub fn default_config_content() -> &'static str {
    r#"# Keyhook configuration
# Place this file at: ~/.config/keyhook/config.toml

[dispatch]
# Threads running hotkey actions
workers = 2

[hook]
# Devices to hook by name or /dev/input path; empty means every keyboard
devices = []

[[hotkey]]
keys = "Ctrl+Shift+K"
# Swallow the key press instead of passing it on
blocking = false
message = "Ctrl+Shift+K pressed"
"#
}
