//! Test doubles for the bridge capability traits

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::bridge::{BridgeBackend, DeviceSession, Intent, MemoryImage, PressType};
use crate::error::{BridgeError, BridgeResult};

/// Session whose calls are recorded and whose liveness can be toggled
#[derive(Debug, Clone)]
pub struct FakeSession {
    alive: Arc<AtomicBool>,
    probe_error: Option<String>,
    fail_with: Option<String>,
    snapshot: Option<MemoryImage>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
            probe_error: None,
            fail_with: None,
            snapshot: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Session whose liveness probe itself errors
    pub fn with_probe_error(mut self, message: &str) -> Self {
        self.probe_error = Some(message.to_string());
        self
    }

    /// Every operation other than the probe fails with `message`
    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    pub fn with_snapshot(mut self, image: MemoryImage) -> Self {
        self.snapshot = Some(image);
        self
    }

    pub fn disconnect(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> BridgeResult<()> {
        self.calls.lock().unwrap().push(call);
        match &self.fail_with {
            Some(message) => Err(BridgeError::CommandFailed(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DeviceSession for FakeSession {
    type Image = MemoryImage;

    async fn get_property(&self, key: &str) -> BridgeResult<Option<String>> {
        if key == "display.width" {
            if let Some(message) = &self.probe_error {
                return Err(BridgeError::Rejected(message.clone()));
            }
            return Ok(self.alive.load(Ordering::SeqCst).then(|| "1080".to_string()));
        }
        self.record(format!("get_property {}", key))?;
        Ok(Some(format!("value-of-{}", key)))
    }

    async fn touch(&self, x: i32, y: i32, kind: PressType) -> BridgeResult<()> {
        self.record(format!("touch {} {} {:?}", x, y, kind))
    }

    async fn drag(
        &self,
        start: (i32, i32),
        end: (i32, i32),
        steps: u32,
        duration: Duration,
    ) -> BridgeResult<()> {
        self.record(format!(
            "drag {:?} {:?} steps={} duration={:?}",
            start, end, steps, duration
        ))
    }

    async fn press(&self, key: &str, kind: PressType) -> BridgeResult<()> {
        self.record(format!("press {} {:?}", key, kind))
    }

    async fn type_text(&self, text: &str) -> BridgeResult<()> {
        self.record(format!("type {}", text))
    }

    async fn shell(&self, command: &str, timeout: Option<Duration>) -> BridgeResult<String> {
        self.record(format!("shell {} {:?}", command, timeout))?;
        Ok(format!("ran {}", command))
    }

    async fn install_package(&self, path: &str) -> BridgeResult<()> {
        self.record(format!("install {}", path))
    }

    async fn remove_package(&self, package: &str) -> BridgeResult<()> {
        self.record(format!("remove {}", package))
    }

    async fn broadcast_intent(&self, intent: &Intent) -> BridgeResult<()> {
        self.record(format!("broadcast {:?}", intent.action))
    }

    async fn start_activity(&self, intent: &Intent) -> BridgeResult<()> {
        self.record(format!("start {:?}", intent.component))
    }

    async fn instrument(
        &self,
        class_name: &str,
        args: &HashMap<String, Value>,
    ) -> BridgeResult<HashMap<String, Value>> {
        self.record(format!("instrument {}", class_name))?;
        let mut result = args.clone();
        result.insert("class".to_string(), Value::from(class_name));
        Ok(result)
    }

    async fn reboot(&self, into: Option<&str>) -> BridgeResult<()> {
        self.record(format!("reboot {:?}", into))
    }

    async fn wake(&self) -> BridgeResult<()> {
        self.record("wake".to_string())
    }

    async fn take_snapshot(&self) -> BridgeResult<Option<MemoryImage>> {
        self.record("snapshot".to_string())?;
        Ok(self.snapshot.clone())
    }
}

/// Backend that replays a scripted sequence of wait outcomes
#[derive(Debug)]
pub struct FakeBackend {
    path: String,
    script: Mutex<VecDeque<BridgeResult<FakeSession>>>,
    attempts: AtomicUsize,
    last_request: Mutex<Option<(Option<Duration>, Option<String>)>>,
}

impl FakeBackend {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            script: Mutex::new(VecDeque::new()),
            attempts: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Fail `failures` times, then hand out `session`
    pub fn succeeding_after(path: &str, failures: usize, session: FakeSession) -> Self {
        let backend = Self::new(path);
        {
            let mut script = backend.script.lock().unwrap();
            for i in 0..failures {
                script.push_back(Err(BridgeError::Timeout(format!("attempt {}", i + 1))));
            }
            script.push_back(Ok(session));
        }
        backend
    }

    pub fn push(&self, outcome: BridgeResult<FakeSession>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(Option<Duration>, Option<String>)> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl BridgeBackend for FakeBackend {
    type Session = FakeSession;

    fn path(&self) -> &str {
        &self.path
    }

    async fn wait_for_device(
        &self,
        timeout: Option<Duration>,
        device_id: Option<&str>,
    ) -> BridgeResult<FakeSession> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some((timeout, device_id.map(str::to_string)));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BridgeError::Timeout("no device".to_string())))
    }
}
