use axum::extract::State;
use axum::Json;
use bytes::Bytes;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::models::trigger::PushEnvelope;
use crate::services::sweep_service;
use crate::state::AppState;

/// Runs one sweep of the configured project. The request body is not interpreted
/// beyond picking a Pub/Sub message id out of it for the logs.
pub async fn handle_trigger(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let envelope = PushEnvelope::parse(&body);
    tracing::info!(
        project = %state.config.project_id,
        message_id = envelope.as_ref().and_then(|e| e.message_id()).unwrap_or("-"),
        subscription = envelope
            .as_ref()
            .and_then(|e| e.subscription.as_deref())
            .unwrap_or("-"),
        payload_bytes = body.len(),
        "Sweep triggered"
    );

    let summary = sweep_service::sweep_now(
        state.inventory.as_ref(),
        state.mutator.as_ref(),
        &state.config.project_id,
    )
    .await?;

    Ok(Json(json!({ "data": summary, "error": null })))
}
