// Keyhook Input Layer - Device Filtering
// Decides which evdev devices the hook grabs

/// Check if a device should be grabbed by the hook.
///
/// The rules are:
///
/// 1. Our own passthrough device is never grabbed, even when named
///    explicitly; grabbing it would feed every forwarded event back into
///    the hook.
/// 2. If filter names are given, only devices matching by path or name.
/// 3. Otherwise (autodetect), only devices that look like keyboards.
///
/// # Arguments
/// * `device_name` - The device name from evdev
/// * `device_path` - The device path (e.g., "/dev/input/event0")
/// * `filter_names` - List of device names/paths to match (empty for autodetect)
/// * `autodetect` - Whether to autodetect keyboards (true when filter_names is empty)
/// * `is_keyboard` - Whether the device is a keyboard (from is_keyboard())
/// * `is_virtual` - Whether the device is a keyhook virtual device
pub fn matches_device_filter(
    device_name: &str,
    device_path: &str,
    filter_names: &[String],
    autodetect: bool,
    is_keyboard: bool,
    is_virtual: bool,
) -> bool {
    if is_virtual {
        return false;
    }

    if !filter_names.is_empty() {
        return filter_names
            .iter()
            .any(|name| device_path == name || device_name == name);
    }

    !autodetect || is_keyboard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_by_path() {
        let filter = vec!["/dev/input/event0".to_string()];
        assert!(matches_device_filter(
            "Logitech Keyboard",
            "/dev/input/event0",
            &filter,
            false,
            true,
            false
        ));
    }

    #[test]
    fn test_matches_by_name() {
        let filter = vec!["Logitech Keyboard".to_string()];
        assert!(matches_device_filter(
            "Logitech Keyboard",
            "/dev/input/event5",
            &filter,
            false,
            true,
            false
        ));
    }

    #[test]
    fn test_explicit_filter_accepts_non_keyboard() {
        let filter = vec!["Macro Pad".to_string()];
        assert!(matches_device_filter(
            "Macro Pad",
            "/dev/input/event7",
            &filter,
            false,
            false,
            false
        ));
    }

    #[test]
    fn test_no_match_when_filtered() {
        let filter = vec!["Specific Device".to_string()];
        assert!(!matches_device_filter(
            "Other Device",
            "/dev/input/event1",
            &filter,
            false,
            true,
            false
        ));
    }

    #[test]
    fn test_autodetect_keyboard() {
        assert!(matches_device_filter(
            "Generic Keyboard",
            "/dev/input/event0",
            &[],
            true,
            true,
            false
        ));
    }

    #[test]
    fn test_autodetect_excludes_non_keyboard() {
        assert!(!matches_device_filter(
            "Generic Mouse",
            "/dev/input/event1",
            &[],
            true,
            false,
            false
        ));
    }

    #[test]
    fn test_virtual_device_never_matches() {
        let filter = vec!["Keyhook (virtual) Passthrough".to_string()];
        assert!(!matches_device_filter(
            "Keyhook (virtual) Passthrough",
            "/dev/input/event9",
            &filter,
            false,
            true,
            true
        ));
        assert!(!matches_device_filter(
            "Keyhook (virtual) Passthrough",
            "/dev/input/event9",
            &[],
            true,
            true,
            true
        ));
    }
}
