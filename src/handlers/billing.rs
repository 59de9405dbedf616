use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use super::check_auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Organization, FREE_PLAN};
use crate::services::billing::webhook::{self, StripeEvent};
use crate::services::billing::{CheckoutRequest, CheckoutSession};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CheckoutBody {
    pub plan: String,
}

// POST /api/orgs/:org_id/billing/checkout
pub async fn create_checkout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(org_id): Path<String>,
    Json(body): Json<CheckoutBody>,
) -> Result<Json<CheckoutSession>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let plan = body.plan.trim().to_lowercase();
    let price_id = state
        .config
        .price_for_plan(&plan)
        .ok_or_else(|| AppError::Validation(format!("unknown plan: {plan}")))?
        .to_string();

    let customer_id = {
        let db = state.db()?;
        queries::get_organization(&db, &org_id)?.and_then(|o| o.stripe_customer_id)
    };

    let base = state.config.public_url.trim_end_matches('/');
    let request = CheckoutRequest {
        org_id,
        plan,
        price_id,
        customer_id,
        success_url: format!("{base}/billing/success?session_id={{CHECKOUT_SESSION_ID}}"),
        cancel_url: format!("{base}/billing/cancel"),
    };

    let session = state.billing.create_checkout_session(&request).await?;
    Ok(Json(session))
}

// GET /api/orgs/:org_id
pub async fn get_organization(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(org_id): Path<String>,
) -> Result<Json<Organization>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db()?;
    let org = queries::get_organization(&db, &org_id)?.unwrap_or_else(|| Organization {
        id: org_id.clone(),
        plan: FREE_PLAN.to_string(),
        stripe_customer_id: None,
        stripe_subscription_id: None,
        subscription_status: None,
        updated_at: Utc::now().naive_utc(),
    });
    Ok(Json(org))
}

// POST /webhook/stripe
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let secret = &state.config.stripe_webhook_secret;
    if secret.is_empty() {
        return Err(AppError::Config("STRIPE_WEBHOOK_SECRET is not set".to_string()));
    }

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if let Err(e) = webhook::verify_signature(secret, signature, &body, Utc::now().timestamp()) {
        tracing::warn!("invalid Stripe signature");
        return Err(e);
    }

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("malformed event: {e}")))?;

    tracing::info!(event_id = %event.id, kind = %event.kind, "stripe event received");

    let Some(change) = webhook::billing_change(&event) else {
        return Ok(Json(json!({ "received": true })));
    };

    let db = state.db()?;
    let org_id = match change.org_id {
        Some(id) => Some(id),
        None => match &change.customer_id {
            Some(customer) => queries::find_org_by_customer(&db, customer)?,
            None => None,
        },
    };

    let Some(org_id) = org_id else {
        tracing::warn!(event_id = %event.id, "stripe event has no resolvable organization");
        return Ok(Json(json!({ "received": true })));
    };

    queries::update_plan(&db, &org_id, &change.update)?;
    tracing::info!(org_id = %org_id, plan = ?change.update.plan, "organization billing updated");

    Ok(Json(json!({ "received": true })))
}
