use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::check_auth;
use crate::errors::AppError;
use crate::models::CalendarEvent;
use crate::services::availability::{self, BookingRequest};
use crate::services::config_store;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub start: DateTime<Utc>,
    pub duration_minutes: Option<u32>,
    pub service: Option<String>,
    pub location: Option<String>,
    pub summary: String,
    pub description: Option<String>,
}

// POST /api/orgs/:org_id/agents/:agent_id/calendar/events
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((org_id, agent_id)): Path<(String, String)>,
    Json(body): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<CalendarEvent>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if body.summary.trim().is_empty() {
        return Err(AppError::Validation("summary is required".to_string()));
    }

    let config = {
        let db = state.db()?;
        config_store::require(&db, &org_id, &agent_id)?
    };

    let request = BookingRequest {
        start: body.start,
        service: body.service,
        duration_minutes: body.duration_minutes,
        location: body.location,
        summary: body.summary,
        description: body.description,
    };
    let event = availability::book(state.calendar.as_ref(), &config, &request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}
