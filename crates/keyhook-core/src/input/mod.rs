// Keyhook Input Layer
// Device detection and filtering for the evdev hook

mod device;
mod filter;

pub use device::{is_keyboard, is_virtual_device, DeviceCapabilities};
pub use filter::matches_device_filter;
