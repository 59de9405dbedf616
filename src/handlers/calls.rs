use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use super::check_auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::CallLog;
use crate::services::calls;
use crate::services::config_store;
use crate::services::voice::CallStarted;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct StartCallRequest {
    pub phone_number: String,
    pub customer_name: Option<String>,
}

// POST /api/orgs/:org_id/agents/:agent_id/calls
pub async fn start_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((org_id, agent_id)): Path<(String, String)>,
    Json(body): Json<StartCallRequest>,
) -> Result<Json<CallStarted>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let config = {
        let db = state.db()?;
        config_store::require(&db, &org_id, &agent_id)?
    };

    let started = calls::start_call(
        state.voice.as_ref(),
        &config,
        &body.phone_number,
        body.customer_name,
    )
    .await?;
    Ok(Json(started))
}

#[derive(Deserialize)]
pub struct CallLogsQuery {
    pub limit: Option<i64>,
}

// GET /api/orgs/:org_id/agents/:agent_id/calls
pub async fn list_calls(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((org_id, agent_id)): Path<(String, String)>,
    Query(query): Query<CallLogsQuery>,
) -> Result<Json<Vec<CallLog>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let db = state.db()?;
    let logs = queries::list_call_logs(&db, &org_id, &agent_id, limit)?;
    Ok(Json(logs))
}
