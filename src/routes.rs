use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let agent = "/api/orgs/:org_id/agents/:agent_id";

    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            &format!("{agent}/config"),
            get(handlers::config::get_config).patch(handlers::config::update_config),
        )
        .route(
            &format!("{agent}/availability"),
            get(handlers::availability::get_summary),
        )
        .route(&format!("{agent}/slots"), get(handlers::availability::get_slots))
        .route(
            &format!("{agent}/calendar/events"),
            post(handlers::calendar::create_event),
        )
        .route(
            &format!("{agent}/provision"),
            post(handlers::provisioning::provision),
        )
        .route(
            &format!("{agent}/calls"),
            get(handlers::calls::list_calls).post(handlers::calls::start_call),
        )
        .route(
            "/api/orgs/:org_id/billing/checkout",
            post(handlers::billing::create_checkout),
        )
        .route("/api/orgs/:org_id", get(handlers::billing::get_organization))
        .route("/webhook/stripe", post(handlers::billing::stripe_webhook))
        .route("/webhook/vapi", post(handlers::webhook::vapi_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
