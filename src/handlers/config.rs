use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::Value;

use super::check_auth;
use crate::errors::AppError;
use crate::services::config_store::{self, ConfigDocument};
use crate::state::AppState;

// GET /api/orgs/:org_id/agents/:agent_id/config
pub async fn get_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((org_id, agent_id)): Path<(String, String)>,
) -> Result<Json<ConfigDocument>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db()?;
    config_store::load(&db, &org_id, &agent_id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("config for {org_id}/{agent_id}")))
}

// PATCH /api/orgs/:org_id/agents/:agent_id/config
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((org_id, agent_id)): Path<(String, String)>,
    Json(patch): Json<Value>,
) -> Result<Json<ConfigDocument>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db()?;
    let doc = config_store::merge(&db, &org_id, &agent_id, &patch)?;
    Ok(Json(doc))
}
