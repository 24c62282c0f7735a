//! adb bridge backend for Android devices
//!
//! This module provides:
//! - `connection`: the `AdbBackend`, device listing and remote connections
//! - `device`: `AdbSession`, the per-device command surface
//! - `input`: `input` argument building (taps, keys, text)
//! - `intent`: `am` command lines for intents and instrumentation
//! - `screenshot`: screencap decoding

mod connection;
mod device;
mod input;
mod intent;
mod screenshot;

pub use connection::{parse_devices, AdbBackend, ConnectionType, DeviceInfo};
pub use device::{parse_wm_density, parse_wm_size, AdbSession};
pub use input::{escape_text, key_code};
pub use intent::{intent_args, parse_instrumentation};
