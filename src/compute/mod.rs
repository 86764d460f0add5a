pub mod client;
pub mod memory;
pub mod token;

use async_trait::async_trait;

use crate::error::CleanupError;
use crate::models::instance::Inventory;

pub use client::ComputeClient;
pub use memory::InMemoryCompute;
pub use token::TokenSource;

/// Lists every instance of a project, grouped by zone.
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn list_all_instances(&self, project_id: &str) -> Result<Inventory, CleanupError>;
}

/// Deletes a single instance.
#[async_trait]
pub trait InstanceMutator: Send + Sync {
    async fn delete_instance(
        &self,
        project_id: &str,
        zone: &str,
        instance_name: &str,
    ) -> Result<(), CleanupError>;
}
