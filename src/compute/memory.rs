use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

use super::{InstanceMutator, InventorySource};
use crate::error::CleanupError;
use crate::models::instance::{Instance, Inventory};

/// Inventory and mutator backed by memory. Deletes remove the instance and are
/// recorded in call order as `(project, zone, name)`.
#[derive(Default)]
pub struct InMemoryCompute {
    inventory: RwLock<Inventory>,
    delete_calls: RwLock<Vec<(String, String, String)>>,
    failing_deletes: RwLock<HashSet<String>>,
    fail_listing: RwLock<bool>,
}

impl InMemoryCompute {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inventory: RwLock::new(inventory),
            ..Default::default()
        }
    }

    pub async fn insert(&self, instance: Instance) {
        self.inventory
            .write()
            .await
            .entry(instance.zone.clone())
            .or_default()
            .push(instance);
    }

    /// Register a zone that has no instances.
    pub async fn add_empty_zone(&self, zone: &str) {
        self.inventory.write().await.entry(zone.to_string()).or_default();
    }

    pub async fn fail_delete_of(&self, instance_name: &str) {
        self.failing_deletes
            .write()
            .await
            .insert(instance_name.to_string());
    }

    pub async fn fail_listing(&self, fail: bool) {
        *self.fail_listing.write().await = fail;
    }

    pub async fn delete_calls(&self) -> Vec<(String, String, String)> {
        self.delete_calls.read().await.clone()
    }

    pub async fn instance_names(&self) -> Vec<String> {
        self.inventory
            .read()
            .await
            .values()
            .flatten()
            .map(|i| i.name.clone())
            .collect()
    }
}

#[async_trait]
impl InventorySource for InMemoryCompute {
    async fn list_all_instances(&self, project_id: &str) -> Result<Inventory, CleanupError> {
        if *self.fail_listing.read().await {
            return Err(CleanupError::Transport {
                project: project_id.to_string(),
                zone: None,
                status: Some(503),
                message: "inventory unavailable".into(),
            });
        }
        Ok(self.inventory.read().await.clone())
    }
}

#[async_trait]
impl InstanceMutator for InMemoryCompute {
    async fn delete_instance(
        &self,
        project_id: &str,
        zone: &str,
        instance_name: &str,
    ) -> Result<(), CleanupError> {
        self.delete_calls.write().await.push((
            project_id.to_string(),
            zone.to_string(),
            instance_name.to_string(),
        ));

        let failure = |status: u16, message: &str| CleanupError::MutationFailure {
            project: project_id.to_string(),
            zone: zone.to_string(),
            instance: instance_name.to_string(),
            status: Some(status),
            message: message.to_string(),
        };

        if self.failing_deletes.read().await.contains(instance_name) {
            return Err(failure(403, "permission denied"));
        }

        let mut inventory = self.inventory.write().await;
        let Some(instances) = inventory.get_mut(zone) else {
            return Err(failure(404, "instance not found"));
        };
        let before = instances.len();
        instances.retain(|i| i.name != instance_name);
        if instances.len() == before {
            return Err(failure(404, "instance not found"));
        }
        Ok(())
    }
}
