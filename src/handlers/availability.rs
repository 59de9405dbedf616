use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use super::check_auth;
use crate::errors::AppError;
use crate::services::availability::{self, SlotQuery, SlotsResponse};
use crate::services::config_store;
use crate::services::scheduling::AvailabilitySummary;
use crate::state::AppState;

// GET /api/orgs/:org_id/agents/:agent_id/availability
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((org_id, agent_id)): Path<(String, String)>,
) -> Result<Json<AvailabilitySummary>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let config = {
        let db = state.db()?;
        config_store::require(&db, &org_id, &agent_id)?
    };

    let summary = availability::week_summary(state.calendar.as_ref(), &config, Utc::now()).await?;
    Ok(Json(summary))
}

#[derive(Deserialize)]
pub struct SlotsParams {
    pub date: NaiveDate,
    pub service: Option<String>,
    pub duration_minutes: Option<u32>,
    pub location: Option<String>,
    pub granularity_minutes: Option<u32>,
}

// GET /api/orgs/:org_id/agents/:agent_id/slots
pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((org_id, agent_id)): Path<(String, String)>,
    Query(params): Query<SlotsParams>,
) -> Result<Json<SlotsResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let config = {
        let db = state.db()?;
        config_store::require(&db, &org_id, &agent_id)?
    };

    let query = SlotQuery {
        date: params.date,
        service: params.service,
        duration_minutes: params.duration_minutes,
        location: params.location,
        granularity_minutes: params.granularity_minutes,
    };
    let slots = availability::day_slots(state.calendar.as_ref(), &config, &query).await?;
    Ok(Json(slots))
}
