//! Bridge process settings, overridable through the environment

use lazy_static::lazy_static;
use std::env;
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Seconds from the environment; negative or non-finite values fall back
fn env_secs(key: &str, default: f64) -> f64 {
    let secs = env_or(key, default);
    if secs.is_finite() && secs >= 0.0 {
        secs
    } else {
        default
    }
}

/// Seconds to a `Duration` without panicking: NaN and negatives become zero,
/// values too large for a `Duration` saturate
pub(crate) fn secs_to_duration(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

/// Settings for the adb bridge process
#[derive(Debug, Clone)]
pub struct AdbConfig {
    /// adb executable used when no explicit path is given
    pub adb_path: String,
    /// Seconds between `adb devices` polls while waiting for a device
    pub poll_interval: f64,
    /// Upper bound in seconds for a single adb command
    pub command_timeout: f64,
}

impl Default for AdbConfig {
    fn default() -> Self {
        Self {
            adb_path: env::var("DROIDRUNNER_ADB_PATH").unwrap_or_else(|_| "adb".to_string()),
            poll_interval: env_secs("DROIDRUNNER_POLL_INTERVAL", 0.5),
            command_timeout: env_secs("DROIDRUNNER_COMMAND_TIMEOUT", 30.0),
        }
    }
}

impl AdbConfig {
    pub fn poll_interval(&self) -> Duration {
        secs_to_duration(self.poll_interval)
    }

    pub fn command_timeout(&self) -> Duration {
        secs_to_duration(self.command_timeout)
    }
}

/// Master configuration
#[derive(Debug, Clone, Default)]
pub struct BridgeConfig {
    pub adb: AdbConfig,
}

lazy_static! {
    /// Global bridge configuration instance
    pub static ref BRIDGE_CONFIG: BridgeConfig = BridgeConfig::default();
}
