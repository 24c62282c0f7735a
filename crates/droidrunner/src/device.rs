//! Validated device handle

use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::bridge::{DeviceSession, Intent, PhysicalButton, PressType};
use crate::error::{BridgeResult, Error, Result};
use crate::snapshot::Snapshot;

/// Property read before every operation to prove the session is alive
pub const LIVENESS_PROPERTY: &str = "display.width";

/// Interpolation steps used when a drag does not name them
pub const DEFAULT_DRAG_STEPS: u32 = 10;

/// Drag duration used when a drag does not name it
pub const DEFAULT_DRAG_DURATION: Duration = Duration::from_secs(1);

/// A device session that is re-validated before every operation.
///
/// Every operation fails with [`Error::DeviceInvalid`] without touching the
/// backend once the liveness probe stops answering, and any backend failure
/// surfaces as [`Error::DeviceOperationFailed`] with the backend's message.
#[derive(Debug)]
pub struct Device<S: DeviceSession> {
    session: S,
}

impl<S: DeviceSession> Device<S> {
    /// Wrap `session`, failing if it does not pass the liveness probe
    pub async fn new(session: S) -> Result<Self> {
        let device = Self { session };
        device.validate().await?;
        Ok(device)
    }

    /// The underlying backend session
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Check the session; `Ok(())` iff the probe property has a value
    pub async fn validate(&self) -> Result<()> {
        match self.session.get_property(LIVENESS_PROPERTY).await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(Error::DeviceInvalid("Device is not valid".to_string())),
            Err(e) => Err(Error::DeviceInvalid(e.to_string())),
        }
    }

    pub async fn is_valid(&self) -> bool {
        self.validate().await.is_ok()
    }

    async fn run<'a, T, F, Fut>(&'a self, op: &str, f: F) -> Result<T>
    where
        F: FnOnce(&'a S) -> Fut,
        Fut: Future<Output = BridgeResult<T>>,
    {
        self.validate().await?;
        debug!("device op: {}", op);
        f(&self.session).await.map_err(Error::operation)
    }

    pub async fn broadcast_intent(&self, intent: &Intent) -> Result<()> {
        self.run("broadcast_intent", |s| s.broadcast_intent(intent))
            .await
    }

    pub async fn start_activity(&self, intent: &Intent) -> Result<()> {
        self.run("start_activity", |s| s.start_activity(intent)).await
    }

    /// Drag with the default duration and step count
    pub async fn drag(&self, start: (i32, i32), end: (i32, i32)) -> Result<()> {
        self.drag_full(start, end, DEFAULT_DRAG_DURATION, DEFAULT_DRAG_STEPS)
            .await
    }

    pub async fn drag_with_steps(&self, start: (i32, i32), end: (i32, i32), steps: u32) -> Result<()> {
        self.drag_full(start, end, DEFAULT_DRAG_DURATION, steps).await
    }

    pub async fn drag_with_duration(
        &self,
        start: (i32, i32),
        end: (i32, i32),
        duration: Duration,
    ) -> Result<()> {
        self.drag_full(start, end, duration, DEFAULT_DRAG_STEPS).await
    }

    pub async fn drag_full(
        &self,
        start: (i32, i32),
        end: (i32, i32),
        duration: Duration,
        steps: u32,
    ) -> Result<()> {
        self.run("drag", |s| s.drag(start, end, steps, duration))
            .await
    }

    pub async fn get_property(&self, key: &str) -> Result<Option<String>> {
        self.run("get_property", |s| s.get_property(key)).await
    }

    /// Same as [`get_property`](Self::get_property)
    pub async fn get_system_property(&self, key: &str) -> Result<Option<String>> {
        self.get_property(key).await
    }

    pub async fn install_package(&self, path: &str) -> Result<()> {
        self.run("install_package", |s| s.install_package(path))
            .await
    }

    pub async fn remove_package(&self, package: &str) -> Result<()> {
        self.run("remove_package", |s| s.remove_package(package))
            .await
    }

    pub async fn instrument(
        &self,
        class_name: &str,
        args: &HashMap<String, Value>,
    ) -> Result<HashMap<String, Value>> {
        self.run("instrument", |s| s.instrument(class_name, args))
            .await
    }

    pub async fn press(&self, key: &str, kind: PressType) -> Result<()> {
        self.run("press", |s| s.press(key, kind)).await
    }

    pub async fn press_button(&self, button: PhysicalButton, kind: PressType) -> Result<()> {
        self.run("press_button", |s| s.press_button(button, kind))
            .await
    }

    pub async fn reboot(&self, into: Option<&str>) -> Result<()> {
        self.run("reboot", |s| s.reboot(into)).await
    }

    pub async fn shell(&self, command: &str) -> Result<String> {
        self.run("shell", |s| s.shell(command, None)).await
    }

    pub async fn shell_with_timeout(&self, command: &str, timeout: Duration) -> Result<String> {
        self.run("shell", |s| s.shell(command, Some(timeout))).await
    }

    /// Capture the screen.
    ///
    /// A device that produces no frame yields a snapshot whose operations
    /// all fail with [`Error::ImageInvalid`].
    pub async fn take_snapshot(&self) -> Result<Snapshot<S::Image>> {
        self.run("take_snapshot", |s| s.take_snapshot())
            .await
            .map(Snapshot::new)
    }

    pub async fn touch(&self, x: i32, y: i32, kind: PressType) -> Result<()> {
        self.run("touch", |s| s.touch(x, y, kind)).await
    }

    pub async fn type_text(&self, text: &str) -> Result<()> {
        self.run("type_text", |s| s.type_text(text)).await
    }

    pub async fn wake(&self) -> Result<()> {
        self.run("wake", |s| s.wake()).await
    }
}
