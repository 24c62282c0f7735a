//! Connection helper: wait for a device with a bounded number of attempts

use std::time::Duration;
use tracing::{debug, info};

use crate::bridge::BridgeBackend;
use crate::config::secs_to_duration;
use crate::device::Device;
use crate::error::Error;
use crate::registry::BackendRegistry;

/// How [`wait_for_connection`] looks for a device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Per-attempt timeout; `None` waits forever
    pub timeout: Option<Duration>,
    /// Attempt budget; `None` retries forever, values below 1 mean 1
    pub tries: Option<i32>,
    /// Pattern matched against device serial numbers
    pub device_id: Option<String>,
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_tries(mut self, tries: i32) -> Self {
        self.tries = Some(tries);
        self
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Attempt budget after clamping; `None` means unbounded
    pub fn max_attempts(&self) -> Option<u32> {
        self.tries.map(|t| t.max(1) as u32)
    }
}

/// Progress of a connection attempt loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    Attempting(u32),
    Connected,
    Exhausted,
}

impl ConnectState {
    /// State after the attempt following `previous` failed attempts fails
    fn after_failure(previous: u32, max_attempts: Option<u32>) -> Self {
        let attempt = previous.saturating_add(1);
        match max_attempts {
            Some(max) if attempt >= max => ConnectState::Exhausted,
            _ => ConnectState::Attempting(attempt),
        }
    }
}

/// Wait for a device on the backend registered for `path`.
///
/// Every failure along the way (timeouts, rejected commands, a session that
/// fails validation) only costs one attempt. Returns `None` once the attempt
/// budget is spent; running out of attempts is not an error.
pub async fn wait_for_connection<B: BridgeBackend>(
    registry: &BackendRegistry<B>,
    path: &str,
    options: &ConnectOptions,
) -> Option<Device<B::Session>> {
    let backend = registry.get_or_create(path).await;
    let max_attempts = options.max_attempts();
    let mut state = ConnectState::Attempting(0);
    let mut connected = None;

    while let ConnectState::Attempting(attempt) = state {
        let result = match backend
            .wait_for_device(options.timeout, options.device_id.as_deref())
            .await
        {
            Ok(session) => Device::new(session).await,
            Err(e) => Err(Error::DeviceOperationFailed(e.to_string())),
        };

        let count = attempt.saturating_add(1);
        state = match result {
            Ok(device) => {
                info!("Connected to device via {} after {} attempt(s)", path, count);
                connected = Some(device);
                ConnectState::Connected
            }
            Err(e) => {
                debug!("Connection attempt {} via {} failed: {}", count, path, e);
                ConnectState::after_failure(attempt, max_attempts)
            }
        };
    }

    if state == ConnectState::Exhausted {
        info!("No device found via {}", path);
    }
    connected
}

/// Helper bundling a registry with the common connection forms
#[derive(Debug)]
pub struct Runner<B: BridgeBackend> {
    registry: BackendRegistry<B>,
}

impl<B: BridgeBackend> Runner<B> {
    pub fn new(registry: BackendRegistry<B>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &BackendRegistry<B> {
        &self.registry
    }

    /// Wait forever for any device
    pub async fn wait_for_connection(&self, path: &str) -> Option<Device<B::Session>> {
        self.connect(path, &ConnectOptions::new()).await
    }

    /// Wait for any device, giving up after `tries` attempts
    pub async fn wait_for_connection_tries(
        &self,
        path: &str,
        tries: i32,
    ) -> Option<Device<B::Session>> {
        self.connect(path, &ConnectOptions::new().with_tries(tries))
            .await
    }

    /// Wait for a matching device, each attempt bounded by `timeout`
    pub async fn wait_for_device_id(
        &self,
        path: &str,
        timeout: Option<Duration>,
        device_id: &str,
    ) -> Option<Device<B::Session>> {
        let options = ConnectOptions {
            timeout,
            tries: None,
            device_id: Some(device_id.to_string()),
        };
        self.connect(path, &options).await
    }

    pub async fn connect(&self, path: &str, options: &ConnectOptions) -> Option<Device<B::Session>> {
        wait_for_connection(&self.registry, path, options).await
    }

    /// Pause the calling script. Negative or NaN durations return at once;
    /// durations too large to represent sleep as long as possible.
    pub async fn sleep(&self, seconds: f64) {
        tokio::time::sleep(secs_to_duration(seconds)).await;
    }
}
