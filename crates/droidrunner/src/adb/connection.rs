//! adb bridge backend: device listing, waiting and remote connections

use async_trait::async_trait;
use regex::Regex;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::device::AdbSession;
use crate::bridge::BridgeBackend;
use crate::config::BRIDGE_CONFIG;
use crate::error::{BridgeError, BridgeResult};

/// Type of adb connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    Usb,
    Emulator,
    Remote,
}

/// One line of `adb devices -l`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub serial: String,
    pub state: String,
    pub connection_type: ConnectionType,
    pub model: Option<String>,
    pub product: Option<String>,
}

impl DeviceInfo {
    /// Whether the device is authorized and ready for commands
    pub fn is_online(&self) -> bool {
        self.state == "device"
    }
}

/// Run one adb invocation, bounded by `timeout`
pub(super) async fn run_adb(adb_path: &str, args: &[&str], timeout: Duration) -> BridgeResult<Output> {
    debug!("{} {}", adb_path, args.join(" "));

    tokio::time::timeout(
        timeout,
        Command::new(adb_path).args(args).kill_on_drop(true).output(),
    )
    .await
    .map_err(|_| {
        BridgeError::Timeout(format!(
            "adb {} timed out after {:?}",
            args.first().unwrap_or(&""),
            timeout
        ))
    })?
    .map_err(BridgeError::Io)
}

/// stdout followed by stderr, lossily decoded
pub(super) fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{}{}", stdout, stderr)
}

/// Parse the output of `adb devices -l`
pub fn parse_devices(stdout: &str) -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("List of devices") || line.starts_with('*') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let serial = parts[0].to_string();
        let connection_type = if serial.starts_with("emulator-") {
            ConnectionType::Emulator
        } else if serial.contains(':') {
            ConnectionType::Remote
        } else {
            ConnectionType::Usb
        };

        let field = |name: &str| {
            parts[2..]
                .iter()
                .find_map(|p| p.strip_prefix(name))
                .map(str::to_string)
        };

        devices.push(DeviceInfo {
            serial,
            state: parts[1].to_string(),
            connection_type,
            model: field("model:"),
            product: field("product:"),
        });
    }

    devices
}

/// Build a matcher that must match the whole serial number
fn serial_matcher(pattern: Option<&str>) -> BridgeResult<Option<Regex>> {
    pattern
        .map(|p| Regex::new(&format!("^(?:{})$", p)))
        .transpose()
        .map_err(BridgeError::from)
}

/// Bridge backend driving an adb executable
#[derive(Debug, Clone)]
pub struct AdbBackend {
    adb_path: String,
    poll_interval: Duration,
    command_timeout: Duration,
}

impl AdbBackend {
    /// Backend for the adb executable named in the configuration
    pub fn new() -> Self {
        Self::with_path(&BRIDGE_CONFIG.adb.adb_path)
    }

    /// Backend for the adb executable at `adb_path`
    pub fn with_path(adb_path: &str) -> Self {
        Self {
            adb_path: adb_path.to_string(),
            poll_interval: BRIDGE_CONFIG.adb.poll_interval(),
            command_timeout: BRIDGE_CONFIG.adb.command_timeout(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    async fn adb(&self, args: &[&str]) -> BridgeResult<Output> {
        run_adb(&self.adb_path, args, self.command_timeout).await
    }

    /// List all devices known to the adb server
    pub async fn list_devices(&self) -> BridgeResult<Vec<DeviceInfo>> {
        let output = self.adb(&["devices", "-l"]).await?;
        if !output.status.success() {
            return Err(BridgeError::CommandFailed(
                combined_output(&output).trim().to_string(),
            ));
        }
        Ok(parse_devices(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Connect to a remote device via TCP/IP
    pub async fn connect(&self, address: &str) -> BridgeResult<String> {
        let address = if address.contains(':') {
            address.to_string()
        } else {
            format!("{}:5555", address)
        };

        let output = self.adb(&["connect", &address]).await?;
        let combined = combined_output(&output);
        let lower = combined.to_lowercase();

        if lower.contains("already connected") {
            Ok(format!("Already connected to {}", address))
        } else if lower.contains("connected") && !lower.contains("failed") {
            Ok(format!("Connected to {}", address))
        } else {
            Err(BridgeError::CommandFailed(combined.trim().to_string()))
        }
    }

    /// Disconnect one remote device, or all of them when `address` is `None`
    pub async fn disconnect(&self, address: Option<&str>) -> BridgeResult<String> {
        let mut args = vec!["disconnect"];
        args.extend(address);

        let output = self.adb(&args).await?;
        let combined = combined_output(&output);
        let result = combined.trim();
        Ok(if result.is_empty() {
            "Disconnected".to_string()
        } else {
            result.to_string()
        })
    }

    async fn poll_for_device(&self, matcher: Option<&Regex>) -> BridgeResult<AdbSession> {
        loop {
            let devices = self.list_devices().await?;
            let found = devices.into_iter().find(|d| {
                d.is_online() && matcher.map_or(true, |m| m.is_match(&d.serial))
            });

            if let Some(device) = found {
                debug!("Found device {}", device.serial);
                return Ok(AdbSession::new(
                    &self.adb_path,
                    &device.serial,
                    self.command_timeout,
                ));
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

impl Default for AdbBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BridgeBackend for AdbBackend {
    type Session = AdbSession;

    fn path(&self) -> &str {
        &self.adb_path
    }

    async fn wait_for_device(
        &self,
        timeout: Option<Duration>,
        device_id: Option<&str>,
    ) -> BridgeResult<AdbSession> {
        let matcher = serial_matcher(device_id)?;
        let poll = self.poll_for_device(matcher.as_ref());

        match timeout {
            Some(limit) => tokio::time::timeout(limit, poll).await.map_err(|_| {
                BridgeError::Timeout(format!("No device appeared within {:?}", limit))
            })?,
            None => poll.await,
        }
    }
}
