pub mod health;
pub mod trigger;

use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::auth::TriggerTokenLayer;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.max_trigger_bytes;

    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/status", get(health::status));

    let mut trigger_routes = Router::new()
        .route("/", post(trigger::handle_trigger))
        .route("/sweep", post(trigger::handle_trigger))
        .layer(RequestBodyLimitLayer::new(max_body));
    if let Some(token) = state.config.trigger_token.clone() {
        trigger_routes = trigger_routes.layer(TriggerTokenLayer::new(token));
    }

    let x_request_id = http::HeaderName::from_static("x-request-id");

    Router::new()
        .merge(public_routes)
        .merge(trigger_routes)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
