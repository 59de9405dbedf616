use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use super::check_auth;
use crate::errors::AppError;
use crate::services::config_store;
use crate::services::provisioning::{self, ProvisionReport};
use crate::state::AppState;

// POST /api/orgs/:org_id/agents/:agent_id/provision
pub async fn provision(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((org_id, agent_id)): Path<(String, String)>,
) -> Result<Json<ProvisionReport>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let config = {
        let db = state.db()?;
        config_store::require(&db, &org_id, &agent_id)?
    };

    tracing::info!(org_id = %org_id, agent_id = %agent_id, "provisioning assistant");
    let report = provisioning::provision(state.voice.as_ref(), &config).await?;
    Ok(Json(report))
}
