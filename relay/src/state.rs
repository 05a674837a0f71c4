use crate::config::AppConfig;
use crate::storage::MessageStore;
use crate::ws::ConnectionRegistry;
use std::sync::Arc;

/// Shared state for one relay instance.
///
/// The registry lives only as long as the process; nothing about open
/// connections is persisted across restarts.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn MessageStore>,
    registry: ConnectionRegistry,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn MessageStore>) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            registry: ConnectionRegistry::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }
}
