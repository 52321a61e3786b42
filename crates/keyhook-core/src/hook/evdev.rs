// Keyhook evdev Hook
// Exclusive keyboard grab with a uinput passthrough for unsuppressed events

use std::collections::HashSet;
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use ::evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use ::evdev::{AttributeSet, Device, EventType, InputEvent};

use super::{HookAdapter, HookCallback, HookError, HookHandle, KeyEvent, Transition};
use crate::input::{is_keyboard, is_virtual_device, matches_device_filter, DeviceCapabilities};
use crate::Key;

/// Name prefix of devices created by keyhook; never grabbed
const VIRT_DEVICE_PREFIX: &str = "Keyhook (virtual)";

/// Poll timeout, bounds how long uninstall waits for the hook thread
const POLL_TIMEOUT_MS: i32 = 100;

/// Device information for listing devices
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Device index
    pub index: usize,
    /// Device name
    pub name: String,
    /// Device path (if available)
    pub path: Option<String>,
}

/// Linux hook adapter.
///
/// `install` grabs every matching keyboard (EVIOCGRAB) so no other reader
/// sees its events, then runs a poll loop on a dedicated thread. Each key
/// transition goes through the callback; events it does not suppress are
/// re-emitted on a uinput passthrough device.
pub struct EvdevHook {
    filter: Vec<String>,
    active: Option<ActiveHook>,
    next_id: u64,
}

struct ActiveHook {
    id: u64,
    running: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl EvdevHook {
    /// Hook all autodetected keyboards
    pub fn new() -> Self {
        Self::with_filter(Vec::new())
    }

    /// Hook only devices whose name or path is listed (autodetect when empty)
    pub fn with_filter(filter: Vec<String>) -> Self {
        Self {
            filter,
            active: None,
            next_id: 0,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.active.is_some()
    }

    /// List all available keyboard devices
    ///
    /// This is useful for the --list-devices CLI flag.
    pub fn list_devices() -> Result<Vec<DeviceInfo>, HookError> {
        let devices_info: Vec<DeviceInfo> = ::evdev::enumerate()
            .filter(|(_, device)| is_keyboard_device(device))
            .enumerate()
            .map(|(index, (path, device))| DeviceInfo {
                index,
                name: device.name().unwrap_or("Unknown").to_string(),
                path: path.to_str().map(|s| s.to_string()),
            })
            .collect();

        if devices_info.is_empty() {
            return Err(HookError::DeviceNotFound(
                "No keyboard devices found".to_string(),
            ));
        }

        Ok(devices_info)
    }

    fn stop_active(&mut self) {
        if let Some(active) = self.active.take() {
            active.running.store(false, Ordering::SeqCst);
            if active.thread.join().is_err() {
                log::error!("evdev hook thread panicked");
            }
            log::debug!("evdev hook {} uninstalled", active.id);
        }
    }
}

impl Default for EvdevHook {
    fn default() -> Self {
        Self::new()
    }
}

impl HookAdapter for EvdevHook {
    fn install(&mut self, callback: HookCallback) -> Result<HookHandle, HookError> {
        if self.active.is_some() {
            return Err(HookError::AlreadyInstalled);
        }

        // Grab and create the passthrough on the caller's thread so failures
        // surface from install()
        let devices = GrabbedDevices::grab(&self.filter)?;
        let passthrough = Passthrough::new()?;
        log::debug!("Grabbed {} device(s): {:?}", devices.len(), devices.names());

        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let thread = thread::Builder::new()
            .name("keyhook-evdev".to_string())
            .spawn(move || run_hook_loop(devices, passthrough, callback, &flag))?;

        self.next_id += 1;
        let id = self.next_id;
        self.active = Some(ActiveHook {
            id,
            running,
            thread,
        });
        log::debug!("evdev hook {} installed", id);
        Ok(HookHandle::new(id))
    }

    fn uninstall(&mut self, handle: HookHandle) {
        if matches!(&self.active, Some(active) if active.id == handle.id()) {
            self.stop_active();
        }
    }
}

impl Drop for EvdevHook {
    fn drop(&mut self) {
        self.stop_active();
    }
}

fn run_hook_loop(
    mut devices: GrabbedDevices,
    mut passthrough: Passthrough,
    mut callback: HookCallback,
    running: &AtomicBool,
) {
    while running.load(Ordering::SeqCst) {
        let events = match devices.poll_for_events(POLL_TIMEOUT_MS) {
            Ok(events) => events,
            Err(e) => {
                log::error!("evdev hook stopped: {}", e);
                break;
            }
        };

        for event in events {
            if event.event_type() != EventType::KEY {
                continue;
            }
            let Some(transition) = Transition::from_evdev_value(event.value()) else {
                continue;
            };

            let key_event = KeyEvent::new(Key::from(event.code()), transition);
            if callback(key_event) {
                log::trace!("Suppressed {:?}", key_event);
                continue;
            }
            if let Err(e) = passthrough.forward(&event) {
                log::warn!("Passthrough write failed: {}", e);
            }
        }
    }
    // devices ungrab and passthrough releases held keys on drop
}

/// Check if a device is a keyboard
fn is_keyboard_device(device: &Device) -> bool {
    // The passthrough device must never be grabbed
    if is_virtual_device(device.name().unwrap_or(""), VIRT_DEVICE_PREFIX) {
        return false;
    }
    is_keyboard(&device_capabilities(device))
}

fn device_capabilities(device: &Device) -> DeviceCapabilities {
    let has_ev_key = device.supported_events().contains(EventType::KEY);
    let supported_keys = device
        .supported_keys()
        .map(|keys| keys.iter().map(|k| k.code()).collect())
        .unwrap_or_default();
    DeviceCapabilities::new(has_ev_key, supported_keys)
}

/// Keyboard devices held under exclusive grab for the life of a hook
struct GrabbedDevices {
    devices: Vec<Device>,
    poll_fds: Vec<libc::pollfd>,
}

impl GrabbedDevices {
    /// Find keyboard devices honoring explicit filter names/paths and grab them.
    fn grab(filter_names: &[String]) -> Result<Self, HookError> {
        let autodetect = filter_names.is_empty();
        let mut devices = Vec::new();

        for (path, device) in ::evdev::enumerate() {
            let device_name = device.name().unwrap_or("Unknown");
            let device_path = path.to_str().unwrap_or_default();
            let is_keyboard = is_keyboard_device(&device);
            let is_virtual = is_virtual_device(device_name, VIRT_DEVICE_PREFIX);

            if matches_device_filter(
                device_name,
                device_path,
                filter_names,
                autodetect,
                is_keyboard,
                is_virtual,
            ) {
                devices.push(device);
            }
        }

        if devices.is_empty() {
            return Err(HookError::DeviceNotFound(
                "No keyboard devices found".to_string(),
            ));
        }

        // A crashed previous instance may have left a grab behind
        for device in &mut devices {
            let _ = device.ungrab();
        }

        let mut grabbed = Self {
            devices: Vec::with_capacity(devices.len()),
            poll_fds: Vec::new(),
        };
        for mut device in devices {
            device.grab()?;
            grabbed.devices.push(device);
        }
        grabbed.poll_fds = grabbed
            .devices
            .iter()
            .map(|d| libc::pollfd {
                fd: d.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();

        Ok(grabbed)
    }

    fn len(&self) -> usize {
        self.devices.len()
    }

    fn names(&self) -> Vec<String> {
        self.devices
            .iter()
            .map(|d| d.name().unwrap_or("Unknown").to_string())
            .collect()
    }

    /// Poll for events with timeout
    ///
    /// Returns an empty vector on timeout or EINTR. Unplugged devices are
    /// dropped; once none remain the poll fails with `NotFound`.
    fn poll_for_events(&mut self, timeout_ms: i32) -> std::io::Result<Vec<InputEvent>> {
        if self.devices.is_empty() {
            return Err(no_devices_left());
        }
        let mut events = Vec::new();

        let poll_result = unsafe {
            libc::poll(
                self.poll_fds.as_mut_ptr(),
                self.poll_fds.len() as libc::nfds_t,
                timeout_ms,
            )
        };

        if poll_result < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                return Ok(events);
            }
            return Err(err);
        }

        if poll_result == 0 {
            return Ok(events);
        }

        let mut gone = Vec::new();
        for (i, device) in self.devices.iter_mut().enumerate() {
            let revents = self.poll_fds[i].revents;
            if revents & libc::POLLIN != 0 {
                let device_name = device.name().map(str::to_owned);
                match device.fetch_events() {
                    Ok(device_events) => events.extend(device_events),
                    Err(e) if is_device_gone(&e) => gone.push(i),
                    Err(e) => log::debug!("Read failed on {:?}: {}", device_name, e),
                }
            } else if revents_hung_up(revents) {
                gone.push(i);
            }
        }

        // Highest index first so earlier indices stay valid
        for i in gone.into_iter().rev() {
            let device = self.devices.remove(i);
            self.poll_fds.remove(i);
            log::warn!(
                "Keyboard {} disappeared; no longer hooked",
                device.name().unwrap_or("Unknown")
            );
        }

        if self.devices.is_empty() {
            return Err(no_devices_left());
        }

        Ok(events)
    }
}

/// Poll flags reporting the fd can never become readable again
fn revents_hung_up(revents: libc::c_short) -> bool {
    revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0
}

fn no_devices_left() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::NotFound, "all hooked keyboards are gone")
}

/// Read error meaning the device was unplugged
fn is_device_gone(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(libc::ENODEV)
}

/// Ungrab on every exit path, including panic unwinding; otherwise the
/// keyboard stays unusable.
impl Drop for GrabbedDevices {
    fn drop(&mut self) {
        for device in &mut self.devices {
            let _ = device.ungrab();
        }
    }
}

/// Virtual uinput keyboard re-emitting events the callback let through
struct Passthrough {
    device: VirtualDevice,
    pressed: HashSet<u16>,
}

impl Passthrough {
    fn new() -> Result<Self, HookError> {
        let mut keys = AttributeSet::new();
        for code in 0..256u16 {
            keys.insert(::evdev::Key::new(code));
        }

        let device = VirtualDeviceBuilder::new()
            .and_then(|builder| builder.name("Keyhook (virtual) Passthrough").with_keys(&keys))
            .and_then(|builder| builder.build())
            .map_err(|e| HookError::Install(format!("Failed to create passthrough device: {}", e)))?;

        Ok(Self {
            device,
            pressed: HashSet::new(),
        })
    }

    fn forward(&mut self, event: &InputEvent) -> std::io::Result<()> {
        let code = event.code();
        // emit() appends the SYN_REPORT
        self.device
            .emit(&[InputEvent::new(EventType::KEY, code, event.value())])?;
        match event.value() {
            0 => {
                self.pressed.remove(&code);
            }
            _ => {
                self.pressed.insert(code);
            }
        }
        Ok(())
    }

    fn release_all(&mut self) {
        for code in self.pressed.drain().collect::<Vec<_>>() {
            let _ = self
                .device
                .emit(&[InputEvent::new(EventType::KEY, code, 0)]);
        }
    }
}

impl Drop for Passthrough {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_devices() {
        match EvdevHook::list_devices() {
            Ok(devices) => {
                for device in &devices {
                    println!("  {}: {} ({:?})", device.index, device.name, device.path);
                    assert!(!device.name.starts_with(VIRT_DEVICE_PREFIX));
                }
            }
            Err(HookError::DeviceNotFound(_)) => {
                println!("Skipping test: no keyboard devices found");
            }
            Err(e) => {
                panic!("Unexpected error: {}", e);
            }
        }
    }

    #[test]
    fn test_install_with_unknown_filter_fails() {
        let mut hook = EvdevHook::with_filter(vec!["/dev/input/keyhook-does-not-exist".to_string()]);
        let result = hook.install(Box::new(|_| false));
        assert!(matches!(result, Err(HookError::DeviceNotFound(_))));
        assert!(!hook.is_installed());
    }

    #[test]
    fn test_hung_up_revents() {
        assert!(revents_hung_up(libc::POLLHUP));
        assert!(revents_hung_up(libc::POLLERR | libc::POLLHUP));
        assert!(revents_hung_up(libc::POLLNVAL));
        assert!(!revents_hung_up(libc::POLLIN));
        assert!(!revents_hung_up(0));
    }

    #[test]
    fn test_enodev_means_device_gone() {
        assert!(is_device_gone(&std::io::Error::from_raw_os_error(libc::ENODEV)));
        assert!(!is_device_gone(&std::io::Error::from_raw_os_error(libc::EAGAIN)));
        assert!(!is_device_gone(&std::io::Error::new(
            std::io::ErrorKind::Other,
            "other"
        )));
    }

    #[test]
    fn test_poll_with_no_devices_left_fails() {
        let mut devices = GrabbedDevices {
            devices: Vec::new(),
            poll_fds: Vec::new(),
        };
        let err = devices.poll_for_events(1).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_uninstall_without_install_is_noop() {
        let mut hook = EvdevHook::new();
        hook.uninstall(HookHandle::new(1));
        assert!(!hook.is_installed());
    }
}
