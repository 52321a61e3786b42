// Keyhook Config
// Combo string parsing and the TOML hotkey configuration

pub mod combo_parser;
pub mod parser;

pub use combo_parser::{parse_combo_string, ComboParseError};
pub use parser::{default_config_content, Config, ConfigError, HotkeyEntry};
