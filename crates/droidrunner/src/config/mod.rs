//! Configuration module for droidrunner
//!
//! - `bridge`: adb process settings

mod bridge;

pub use bridge::{AdbConfig, BridgeConfig, BRIDGE_CONFIG};
pub(crate) use bridge::secs_to_duration;
