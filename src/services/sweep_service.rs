use chrono::{DateTime, Utc};

use crate::compute::{InstanceMutator, InventorySource};
use crate::error::CleanupError;
use crate::models::instance::InstanceRef;
use crate::models::trigger::SweepSummary;
use crate::services::eviction_service;

/// One full pass over the project's inventory.
///
/// Zones and instances are handled one at a time, in inventory order. The first
/// classification or deletion error stops the sweep; nothing after it is touched.
pub async fn sweep(
    inventory: &dyn InventorySource,
    mutator: &dyn InstanceMutator,
    project_id: &str,
    now: DateTime<Utc>,
) -> Result<SweepSummary, CleanupError> {
    let zones = inventory
        .list_all_instances(project_id)
        .await
        .map_err(|e| e.with_target(project_id, None, None))?;
    let mut summary = SweepSummary::new(project_id);

    for (zone, instances) in &zones {
        if instances.is_empty() {
            continue;
        }
        summary.zones_scanned += 1;

        for instance in instances {
            summary.examined += 1;
            let Some(ttl) = eviction_service::ttl_minutes(instance) else {
                continue;
            };
            summary.with_ttl += 1;

            let in_context = |e: CleanupError| {
                e.with_target(project_id, Some(zone.as_str()), Some(instance.name.as_str()))
            };
            let due = eviction_service::is_past_ttl(instance, ttl, now).map_err(in_context)?;
            if !due {
                continue;
            }

            tracing::info!(
                project = %project_id,
                zone = %zone,
                instance = %instance.name,
                "Deleting expired instance"
            );
            mutator
                .delete_instance(project_id, zone, &instance.name)
                .await
                .map_err(in_context)?;

            summary.deleted.push(InstanceRef {
                zone: zone.clone(),
                name: instance.name.clone(),
            });
        }
    }

    tracing::info!(
        project = %project_id,
        zones = summary.zones_scanned,
        examined = summary.examined,
        with_ttl = summary.with_ttl,
        deleted = summary.deleted.len(),
        "Sweep completed"
    );

    Ok(summary)
}

/// Sweep against wall-clock time, logging the failure before handing it back.
pub async fn sweep_now(
    inventory: &dyn InventorySource,
    mutator: &dyn InstanceMutator,
    project_id: &str,
) -> Result<SweepSummary, CleanupError> {
    let result = sweep(inventory, mutator, project_id, Utc::now()).await;
    if let Err(e) = &result {
        tracing::error!(
            project = %project_id,
            kind = ?e.kind(),
            retryable = e.is_retryable(),
            error = %e,
            "Sweep aborted"
        );
    }
    result
}
