//! Registry of bridge backends keyed by connection path

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::adb::AdbBackend;
use crate::bridge::BridgeBackend;

type BackendFactory<B> = Box<dyn Fn(&str) -> B + Send + Sync>;

/// Hands out one shared backend per distinct connection path.
///
/// Backends are created on first request and live as long as the registry.
pub struct BackendRegistry<B: BridgeBackend> {
    factory: BackendFactory<B>,
    backends: RwLock<HashMap<String, Arc<B>>>,
}

impl BackendRegistry<AdbBackend> {
    /// Create a registry producing adb backends
    pub fn new() -> Self {
        Self::with_factory(AdbBackend::with_path)
    }
}

impl Default for BackendRegistry<AdbBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: BridgeBackend> BackendRegistry<B> {
    /// Create a registry that builds backends with `factory`
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn(&str) -> B + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            backends: RwLock::new(HashMap::new()),
        }
    }

    /// Return the backend bound to `path`, creating it on first use
    pub async fn get_or_create(&self, path: &str) -> Arc<B> {
        if let Some(backend) = self.backends.read().await.get(path) {
            return Arc::clone(backend);
        }

        let mut backends = self.backends.write().await;
        // Another caller may have won the race between the two locks
        let backend = backends.entry(path.to_string()).or_insert_with(|| {
            debug!("Creating backend for {}", path);
            Arc::new((self.factory)(path))
        });
        Arc::clone(backend)
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.backends.read().await.contains_key(path)
    }

    pub async fn len(&self) -> usize {
        self.backends.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.backends.read().await.is_empty()
    }
}

impl<B: BridgeBackend> fmt::Debug for BackendRegistry<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry").finish_non_exhaustive()
    }
}
