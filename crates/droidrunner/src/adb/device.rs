//! Device session backed by `adb -s <serial>` commands

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::process::Output;
use std::time::Duration;
use tracing::debug;

use super::connection::{combined_output, run_adb};
use super::input::{escape_text, key_args, touch_args};
use super::intent::{am_command, instrument_command, parse_instrumentation, shell_quote};
use super::screenshot::decode_screencap;
use crate::bridge::{DeviceSession, Intent, MemoryImage, PressType};
use crate::error::{BridgeError, BridgeResult};

lazy_static! {
    static ref WM_SIZE: Regex = Regex::new(r"(Physical|Override) size: (\d+)x(\d+)").unwrap();
    static ref WM_DENSITY: Regex = Regex::new(r"(Physical|Override) density: (\d+)").unwrap();
}

/// Pick the effective value from `wm size` / `wm density` style output;
/// an override beats the physical value
fn effective<'a, T>(found: impl Iterator<Item = (&'a str, T)>) -> Option<T> {
    let mut physical = None;
    for (kind, value) in found {
        if kind == "Override" {
            return Some(value);
        }
        physical.get_or_insert(value);
    }
    physical
}

/// Parse `wm size` output into (width, height)
pub fn parse_wm_size(output: &str) -> Option<(u32, u32)> {
    effective(WM_SIZE.captures_iter(output).filter_map(|c| {
        let kind = c.get(1)?.as_str();
        Some((kind, (c[2].parse().ok()?, c[3].parse().ok()?)))
    }))
}

/// Parse `wm density` output
pub fn parse_wm_density(output: &str) -> Option<u32> {
    effective(WM_DENSITY.captures_iter(output).filter_map(|c| {
        let kind = c.get(1)?.as_str();
        Some((kind, c[2].parse().ok()?))
    }))
}

/// A session on one device, addressed by serial number
#[derive(Debug, Clone)]
pub struct AdbSession {
    adb_path: String,
    serial: String,
    command_timeout: Duration,
}

impl AdbSession {
    pub fn new(adb_path: &str, serial: &str, command_timeout: Duration) -> Self {
        Self {
            adb_path: adb_path.to_string(),
            serial: serial.to_string(),
            command_timeout,
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    async fn adb_with_timeout(&self, args: &[&str], timeout: Duration) -> BridgeResult<Output> {
        let mut full = vec!["-s", self.serial.as_str()];
        full.extend_from_slice(args);
        run_adb(&self.adb_path, &full, timeout).await
    }

    async fn adb(&self, args: &[&str]) -> BridgeResult<Output> {
        self.adb_with_timeout(args, self.command_timeout).await
    }

    /// Run `adb shell <command>` and fail if adb itself reports an error
    async fn shell_checked(&self, command: &str) -> BridgeResult<String> {
        let output = self.adb(&["shell", command]).await?;
        let combined = combined_output(&output);
        if !output.status.success() {
            return Err(BridgeError::CommandFailed(combined.trim().to_string()));
        }
        Ok(combined)
    }

    async fn input(&self, args: &[String]) -> BridgeResult<()> {
        let command = format!("input {}", args.join(" "));
        let out = self.shell_checked(&command).await?;
        if out.contains("Error") || out.contains("Exception") {
            return Err(BridgeError::CommandFailed(out.trim().to_string()));
        }
        Ok(())
    }

    /// Run an `adb install`-style command whose output must report success
    async fn package_command(&self, args: &[&str]) -> BridgeResult<()> {
        let output = self.adb(args).await?;
        let combined = combined_output(&output);
        if combined.contains("Success") {
            Ok(())
        } else {
            Err(BridgeError::CommandFailed(combined.trim().to_string()))
        }
    }

    async fn am(&self, subcommand: &str, intent: &Intent) -> BridgeResult<()> {
        let out = self.shell_checked(&am_command(subcommand, intent)).await?;
        if out.contains("Error") {
            return Err(BridgeError::CommandFailed(out.trim().to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceSession for AdbSession {
    type Image = MemoryImage;

    async fn get_property(&self, key: &str) -> BridgeResult<Option<String>> {
        let value = match key {
            "display.width" | "display.height" => {
                let out = self.shell_checked("wm size").await?;
                parse_wm_size(&out).map(|(w, h)| {
                    let side = if key == "display.width" { w } else { h };
                    side.to_string()
                })
            }
            "display.density" => {
                let out = self.shell_checked("wm density").await?;
                parse_wm_density(&out).map(|d| d.to_string())
            }
            _ => {
                let out = self
                    .shell_checked(&format!("getprop {}", shell_quote(key)))
                    .await?;
                let out = out.trim();
                (!out.is_empty()).then(|| out.to_string())
            }
        };
        Ok(value)
    }

    async fn touch(&self, x: i32, y: i32, kind: PressType) -> BridgeResult<()> {
        self.input(&touch_args(x, y, kind)).await
    }

    async fn drag(
        &self,
        start: (i32, i32),
        end: (i32, i32),
        steps: u32,
        duration: Duration,
    ) -> BridgeResult<()> {
        // input swipe interpolates on the device
        debug!("drag with {} steps delegated to input swipe", steps);
        let args = [
            "swipe".to_string(),
            start.0.to_string(),
            start.1.to_string(),
            end.0.to_string(),
            end.1.to_string(),
            duration.as_millis().to_string(),
        ];
        self.input(&args).await
    }

    /// `Down` sends a long press, which the device releases by itself, so a
    /// following `Up` sends nothing and returns `Ok(())`.
    async fn press(&self, key: &str, kind: PressType) -> BridgeResult<()> {
        match key_args(key, kind) {
            Some(args) => self.input(&args).await,
            None => Ok(()),
        }
    }

    async fn type_text(&self, text: &str) -> BridgeResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.input(&["text".to_string(), escape_text(text)]).await
    }

    async fn shell(&self, command: &str, timeout: Option<Duration>) -> BridgeResult<String> {
        let timeout = timeout.unwrap_or(self.command_timeout);
        let output = self.adb_with_timeout(&["shell", command], timeout).await?;
        Ok(combined_output(&output))
    }

    async fn install_package(&self, path: &str) -> BridgeResult<()> {
        self.package_command(&["install", "-r", path]).await
    }

    async fn remove_package(&self, package: &str) -> BridgeResult<()> {
        self.package_command(&["uninstall", package]).await
    }

    async fn broadcast_intent(&self, intent: &Intent) -> BridgeResult<()> {
        self.am("broadcast", intent).await
    }

    async fn start_activity(&self, intent: &Intent) -> BridgeResult<()> {
        self.am("start", intent).await
    }

    async fn instrument(
        &self,
        class_name: &str,
        args: &HashMap<String, Value>,
    ) -> BridgeResult<HashMap<String, Value>> {
        let out = self
            .shell_checked(&instrument_command(class_name, args))
            .await?;
        Ok(parse_instrumentation(&out))
    }

    async fn reboot(&self, into: Option<&str>) -> BridgeResult<()> {
        let mut args = vec!["reboot"];
        args.extend(into);
        let output = self.adb(&args).await?;
        if !output.status.success() {
            return Err(BridgeError::CommandFailed(
                combined_output(&output).trim().to_string(),
            ));
        }
        Ok(())
    }

    async fn wake(&self) -> BridgeResult<()> {
        self.input(&["keyevent".to_string(), "KEYCODE_WAKEUP".to_string()])
            .await
    }

    async fn take_snapshot(&self) -> BridgeResult<Option<MemoryImage>> {
        let output = self.adb(&["exec-out", "screencap", "-p"]).await?;
        decode_screencap(&output)
    }
}
