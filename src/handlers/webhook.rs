use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::BusinessConfig;
use crate::services::calls::{self, CallReport};
use crate::services::config_store;
use crate::services::tools;
use crate::state::AppState;

/// Compare the shared secret in constant time: both sides are MACed under the
/// configured secret and the tags compared with `verify_slice`.
fn secret_matches(expected: &str, provided: &str) -> bool {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(expected.as_bytes()) else {
        return false;
    };
    let mut reference = mac.clone();
    reference.update(expected.as_bytes());
    let tag = reference.finalize().into_bytes();

    mac.update(provided.as_bytes());
    mac.verify_slice(&tag).is_ok()
}

fn assistant_id(message: &Value) -> Option<&str> {
    message["call"]["assistantId"]
        .as_str()
        .or_else(|| message["assistant"]["id"].as_str())
}

fn owning_agent(
    state: &Arc<AppState>,
    message: &Value,
) -> Result<(String, String, BusinessConfig), AppError> {
    let assistant_id = assistant_id(message)
        .ok_or_else(|| AppError::Validation("message has no assistant id".to_string()))?;

    let db = state.db()?;
    let (org_id, agent_id) = queries::find_agent_by_assistant(&db, assistant_id)?
        .ok_or_else(|| AppError::NotFound(format!("agent for assistant {assistant_id}")))?;
    let config = config_store::require(&db, &org_id, &agent_id)?;
    Ok((org_id, agent_id, config))
}

// POST /webhook/vapi
pub async fn vapi_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    // Skip the shared-secret check when none is configured (dev mode)
    if !state.config.vapi_webhook_secret.is_empty() {
        let provided = headers
            .get("x-vapi-secret")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !secret_matches(&state.config.vapi_webhook_secret, provided) {
            tracing::warn!("invalid or missing x-vapi-secret");
            return Err(AppError::Forbidden);
        }
    }

    let message = &body["message"];
    let kind = message["type"].as_str().unwrap_or("");
    tracing::info!(kind, "voice platform message");

    match kind {
        "tool-calls" => {
            let (_, _, config) = owning_agent(&state, message)?;
            let calls = message["toolCallList"]
                .as_array()
                .or_else(|| message["toolCalls"].as_array())
                .cloned()
                .unwrap_or_default();

            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                let id = call["id"].as_str().unwrap_or_default();
                let name = call["function"]["name"].as_str().unwrap_or_default();
                let result =
                    tools::run_tool(state.calendar.as_ref(), &config, name, &call["function"]["arguments"])
                        .await;
                results.push(json!({ "toolCallId": id, "result": result }));
            }
            Ok(Json(json!({ "results": results })))
        }
        "end-of-call-report" => {
            let (org_id, agent_id, config) = owning_agent(&state, message)?;
            let report: CallReport = serde_json::from_value(message.clone())
                .map_err(|e| AppError::Validation(format!("malformed call report: {e}")))?;
            let log = calls::record_report(&state, &org_id, &agent_id, &config, report).await?;
            Ok(Json(json!({ "ok": true, "call_log_id": log.id, "email_sent": log.email_sent })))
        }
        _ => Ok(Json(json!({ "ok": true }))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_matches() {
        assert!(secret_matches("s3cret", "s3cret"));
        assert!(!secret_matches("s3cret", "s3creT"));
        assert!(!secret_matches("s3cret", "s3cret "));
        assert!(!secret_matches("s3cret", ""));
    }

    #[test]
    fn test_assistant_id_from_call_or_assistant() {
        assert_eq!(
            assistant_id(&json!({"call": {"assistantId": "asst_1"}})),
            Some("asst_1")
        );
        assert_eq!(assistant_id(&json!({"assistant": {"id": "asst_2"}})), Some("asst_2"));
        assert_eq!(assistant_id(&json!({"type": "status-update"})), None);
    }
}
