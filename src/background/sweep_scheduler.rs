use crate::services::sweep_service;
use crate::state::AppState;
use std::time::Duration;
use tokio::sync::watch;

/// Sweeps every `interval` until shutdown. A failed sweep is already logged by
/// `sweep_now`; the loop just waits for the next tick.
pub async fn run(state: AppState, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    tracing::info!(
        project = %state.config.project_id,
        interval_secs = interval.as_secs(),
        "Sweep scheduler started"
    );

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {
                tracing::info!("Sweep scheduler shutting down");
                return;
            }
        }

        let _ = sweep_service::sweep_now(
            state.inventory.as_ref(),
            state.mutator.as_ref(),
            &state.config.project_id,
        )
        .await;
    }
}
