// Keyhook Core Library
// Global hotkeys on top of a system-wide keyboard hook

pub mod combo;
pub mod config;
pub mod dispatch;
pub mod hook;
pub mod input;
pub mod key;
pub mod manager;
pub mod modifier;
pub mod registry;
pub mod state;

pub use combo::Combo;
pub use config::{parse_combo_string, ComboParseError, Config, ConfigError, HotkeyEntry};
pub use dispatch::{ActionFailure, DispatchError, Dispatcher};
pub use hook::{HookAdapter, HookCallback, HookError, HookHandle, KeyEvent, ManualHook, Transition};
pub use key::{key_from_name, Key};
pub use manager::{HotkeyManager, ManagerError};
pub use modifier::{classify, Modifier, ModifierSet};
pub use registry::{Binding, HotkeyAction, HotkeyId, Registry, RegistryError};
pub use state::KeyTracker;

#[cfg(feature = "native-hook")]
pub use hook::NativeHook;
