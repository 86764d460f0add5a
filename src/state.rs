use crate::compute::{InstanceMutator, InventorySource};
use crate::config::AppConfig;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub inventory: Arc<dyn InventorySource>,
    pub mutator: Arc<dyn InstanceMutator>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        inventory: Arc<dyn InventorySource>,
        mutator: Arc<dyn InstanceMutator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            inventory,
            mutator,
            start_time: chrono::Utc::now(),
        }
    }

    /// State where one backend serves as both inventory and mutator.
    pub fn with_backend<B>(config: AppConfig, backend: Arc<B>) -> Self
    where
        B: InventorySource + InstanceMutator + 'static,
    {
        Self::new(config, backend.clone(), backend)
    }
}
