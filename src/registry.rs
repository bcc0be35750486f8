use crate::config::Config;
use crate::engines::devto::{ClientSettings, DevToClient, DevToEngine};
use crate::engines::Engine;
use crate::error::{ImportError, Result};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Directory of import engines keyed by name. Registering a name twice
/// replaces the earlier engine.
#[derive(Default)]
pub struct EngineRegistry {
    engines: RwLock<HashMap<String, Arc<dyn Engine>>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in engine, configured from `config`.
    pub fn with_default_engines(config: &Config) -> Self {
        let registry = Self::new();
        let client = DevToClient::with_settings(ClientSettings {
            base_url: config.devto.base_url.clone(),
            request_timeout: config.devto.request_timeout(),
        });
        registry.register(Arc::new(DevToEngine::with_client(client)));
        registry
    }

    pub fn register(&self, engine: Arc<dyn Engine>) {
        let name = engine.name().to_string();
        debug!("Registering import engine {}", name);
        self.engines
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, engine);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Engine>> {
        self.engines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Like [`get`](Self::get), but an unknown name is an `InvalidArgument`
    /// listing what is available.
    pub fn require(&self, name: &str) -> Result<Arc<dyn Engine>> {
        self.get(name).ok_or_else(|| {
            ImportError::invalid_argument(format!(
                "unknown engine: {} (available: {:?})",
                name,
                self.list()
            ))
        })
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .engines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn clear(&self) {
        self.engines
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
