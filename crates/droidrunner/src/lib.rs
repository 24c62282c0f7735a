//! droidrunner: scriptable Android device automation over a bridge backend
//!
//! This library provides:
//! - Capability traits for bridge backends, device sessions and screen buffers
//! - A registry handing out one backend per connection path
//! - A connection helper with a bounded retry loop
//! - A validated device handle for gestures, shell, packages and intents
//! - Screen snapshots with approximate image comparison
//! - An adb backend driving the `adb` executable
//!
//! # Example
//!
//! ```no_run
//! use droidrunner::{BackendRegistry, ConnectOptions, PressType, wait_for_connection};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> droidrunner::Result<()> {
//!     let registry = BackendRegistry::new();
//!     let options = ConnectOptions::new()
//!         .with_timeout(Duration::from_secs(10))
//!         .with_tries(3);
//!
//!     let Some(device) = wait_for_connection(&registry, "adb", &options).await else {
//!         println!("No device");
//!         return Ok(());
//!     };
//!
//!     device.touch(540, 1200, PressType::DownAndUp).await?;
//!     device.drag((540, 1800), (540, 600)).await?;
//!
//!     let before = device.take_snapshot().await?;
//!     device.press("BACK", PressType::DownAndUp).await?;
//!     let after = device.take_snapshot().await?;
//!     println!("unchanged: {}", before.same_as(&after, 0.98)?);
//!     Ok(())
//! }
//! ```

// Core modules
pub mod error;

// Configuration module
pub mod config;

// Backend interfaces and the adb implementation
pub mod adb;
pub mod bridge;

// Core functionality
pub mod device;
pub mod registry;
pub mod runner;
pub mod snapshot;

#[cfg(test)]
mod testing;

// Re-export commonly used types and functions
pub use error::{BridgeError, BridgeResult, Error, Result};

pub use config::{AdbConfig, BridgeConfig, BRIDGE_CONFIG};

pub use adb::{AdbBackend, AdbSession, ConnectionType, DeviceInfo};

pub use bridge::{
    Argb, BridgeBackend, DeviceSession, Intent, MemoryImage, PhysicalButton, PressType, RawImage,
};

pub use device::{Device, DEFAULT_DRAG_DURATION, DEFAULT_DRAG_STEPS, LIVENESS_PROPERTY};
pub use registry::BackendRegistry;
pub use runner::{wait_for_connection, ConnectOptions, ConnectState, Runner};
pub use snapshot::Snapshot;
