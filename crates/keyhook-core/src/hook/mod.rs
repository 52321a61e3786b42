// Keyhook Hook Layer
// Platform adapters delivering system-wide key transitions

pub mod manual;

#[cfg(all(feature = "native-hook", target_os = "linux"))]
pub mod evdev;

#[cfg(all(feature = "native-hook", windows))]
pub mod windows;

use std::fmt;

use crate::Key;

pub use manual::ManualHook;

#[cfg(all(feature = "native-hook", target_os = "linux"))]
pub use self::evdev::{DeviceInfo, EvdevHook};

#[cfg(all(feature = "native-hook", windows))]
pub use self::windows::LowLevelHook;

/// The hook adapter for the platform this crate was built for
#[cfg(all(feature = "native-hook", target_os = "linux"))]
pub type NativeHook = EvdevHook;

/// The hook adapter for the platform this crate was built for
#[cfg(all(feature = "native-hook", windows))]
pub type NativeHook = LowLevelHook;

/// Direction of a key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Down,
    Up,
}

impl Transition {
    /// Map an evdev event value (0 release, 1 press, 2 repeat)
    pub fn from_evdev_value(value: i32) -> Option<Self> {
        match value {
            1 | 2 => Some(Transition::Down),
            0 => Some(Transition::Up),
            _ => None,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Down => write!(f, "down"),
            Transition::Up => write!(f, "up"),
        }
    }
}

/// A raw key transition delivered by a hook adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub transition: Transition,
    /// Windows WM_SYSKEY* context (Alt held or no focused window)
    pub system: bool,
}

impl KeyEvent {
    pub fn new(key: Key, transition: Transition) -> Self {
        Self {
            key,
            transition,
            system: false,
        }
    }

    pub fn down(key: Key) -> Self {
        Self::new(key, Transition::Down)
    }

    pub fn up(key: Key) -> Self {
        Self::new(key, Transition::Up)
    }

    pub fn with_system(mut self, system: bool) -> Self {
        self.system = system;
        self
    }
}

/// Hook callback: returns `true` to suppress the event
pub type HookCallback = Box<dyn FnMut(KeyEvent) -> bool + Send + 'static>;

/// Owned token for one installation of a hook
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct HookHandle {
    id: u64,
}

impl HookHandle {
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Errors that can occur installing a hook
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Hook install failed: {0}")]
    Install(String),

    #[error("Hook is already installed")]
    AlreadyInstalled,
}

/// Platform capability that intercepts system-wide key transitions.
///
/// The callback runs on the adapter's hook thread, once per transition, in
/// the order the OS observed them, and must return quickly: its result
/// decides whether the event continues to the rest of the system.
pub trait HookAdapter: Send {
    /// Start delivering events to `callback`
    fn install(&mut self, callback: HookCallback) -> Result<HookHandle, HookError>;

    /// Stop delivering events for `handle`. Stale handles are ignored.
    fn uninstall(&mut self, handle: HookHandle);
}

impl<H: HookAdapter + ?Sized> HookAdapter for Box<H> {
    fn install(&mut self, callback: HookCallback) -> Result<HookHandle, HookError> {
        (**self).install(callback)
    }

    fn uninstall(&mut self, handle: HookHandle) {
        (**self).uninstall(handle)
    }
}
