// Keyhook Input Layer - Device Detection
// Keyboard detection from evdev capabilities

use std::collections::HashSet;

/// Device capabilities extracted from an evdev device
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    /// Whether the device supports EV_KEY events
    pub has_ev_key: bool,
    /// Supported key codes (EV_KEY capability codes)
    pub supported_keys: Vec<u16>,
}

impl DeviceCapabilities {
    pub fn new(has_ev_key: bool, supported_keys: Vec<u16>) -> Self {
        Self {
            has_ev_key,
            supported_keys,
        }
    }

    /// Check if a specific key code is supported
    pub fn supports_key(&self, key_code: u16) -> bool {
        self.supported_keys.contains(&key_code)
    }
}

// QWERTY row key codes: Q, W, E, R, T, Y
const QWERTY_CODES: &[u16] = &[16, 17, 18, 19, 20, 21];

// Representative A-Z and SPACE codes: SPACE, A, Z
const A_Z_SPACE_CODES: &[u16] = &[57, 30, 44];

/// Determine if a device is a keyboard based on its capabilities.
///
/// Power buttons, media remotes and mice also report EV_KEY, so a device
/// only counts when the QWERTY row plus A, Z and SPACE are all present.
pub fn is_keyboard(capabilities: &DeviceCapabilities) -> bool {
    if !capabilities.has_ev_key {
        return false;
    }

    let key_set: HashSet<u16> = capabilities.supported_keys.iter().copied().collect();
    QWERTY_CODES
        .iter()
        .chain(A_Z_SPACE_CODES)
        .all(|code| key_set.contains(code))
}

/// Check if a device was created by keyhook itself.
pub fn is_virtual_device(name: &str, prefix: &str) -> bool {
    name.starts_with(prefix)
}
