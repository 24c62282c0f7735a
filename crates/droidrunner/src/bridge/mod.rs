//! Capability interfaces every bridge backend provides
//!
//! This module provides:
//! - `BridgeBackend`: opens device sessions
//! - `DeviceSession`: input, shell, packages, intents and capture on one device
//! - `RawImage`: a captured screen buffer
//! - `memory`: an in-memory RGBA implementation of `RawImage`

mod memory;
mod types;

pub use memory::MemoryImage;
pub use types::{Argb, Intent, PhysicalButton, PressType};

use async_trait::async_trait;
use image::RgbaImage;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::BridgeResult;

/// A bridge to devices reachable through one connection path
#[async_trait]
pub trait BridgeBackend: Send + Sync {
    type Session: DeviceSession;

    /// Connection path this backend is bound to
    fn path(&self) -> &str;

    /// Block until a device is available and open a session on it.
    ///
    /// `timeout` of `None` waits forever. `device_id` is a pattern matched
    /// against device serial numbers; `None` accepts any device.
    async fn wait_for_device(
        &self,
        timeout: Option<Duration>,
        device_id: Option<&str>,
    ) -> BridgeResult<Self::Session>;
}

/// A live session on one device
#[async_trait]
pub trait DeviceSession: Send + Sync {
    type Image: RawImage;

    /// Read a named device property; `Ok(None)` when the device has no value
    async fn get_property(&self, key: &str) -> BridgeResult<Option<String>>;

    async fn touch(&self, x: i32, y: i32, kind: PressType) -> BridgeResult<()>;

    async fn drag(
        &self,
        start: (i32, i32),
        end: (i32, i32),
        steps: u32,
        duration: Duration,
    ) -> BridgeResult<()>;

    /// Press a key by its key code name, e.g. `KEYCODE_MENU` or `MENU`
    async fn press(&self, key: &str, kind: PressType) -> BridgeResult<()>;

    async fn press_button(&self, button: PhysicalButton, kind: PressType) -> BridgeResult<()> {
        self.press(button.key_name(), kind).await
    }

    async fn type_text(&self, text: &str) -> BridgeResult<()>;

    /// Run a shell command on the device and return its output
    async fn shell(&self, command: &str, timeout: Option<Duration>) -> BridgeResult<String>;

    async fn install_package(&self, path: &str) -> BridgeResult<()>;

    async fn remove_package(&self, package: &str) -> BridgeResult<()>;

    async fn broadcast_intent(&self, intent: &Intent) -> BridgeResult<()>;

    async fn start_activity(&self, intent: &Intent) -> BridgeResult<()>;

    /// Run an instrumentation class and return its result bundle
    async fn instrument(
        &self,
        class_name: &str,
        args: &HashMap<String, Value>,
    ) -> BridgeResult<HashMap<String, Value>>;

    /// Reboot the device, optionally into `bootloader`, `recovery`, ...
    async fn reboot(&self, into: Option<&str>) -> BridgeResult<()>;

    async fn wake(&self) -> BridgeResult<()>;

    /// Capture the screen. `Ok(None)` means the device produced no frame,
    /// e.g. because the current window is marked secure.
    async fn take_snapshot(&self) -> BridgeResult<Option<Self::Image>>;
}

/// An immutable screen buffer with the origin at the top-left corner
pub trait RawImage: Send + Sync + Sized {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Packed `0xAARRGGBB` value at (x, y)
    fn pixel(&self, x: u32, y: u32) -> BridgeResult<u32>;

    fn sub_image(&self, x: u32, y: u32, width: u32, height: u32) -> BridgeResult<Self>;

    /// Full-colour view of the buffer
    fn to_rgba(&self) -> BridgeResult<Cow<'_, RgbaImage>>;

    /// Encode into a raster format named by its usual extension (`png`, `jpg`, ...)
    fn convert_to_bytes(&self, format: &str) -> BridgeResult<Vec<u8>>;

    /// Encode to `path`; the format comes from the extension when `format` is `None`
    fn write_to_file(&self, path: &Path, format: Option<&str>) -> BridgeResult<()>;
}
