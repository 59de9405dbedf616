pub mod availability;
pub mod billing;
pub mod calendar;
pub mod calls;
pub mod config;
pub mod health;
pub mod provisioning;
pub mod webhook;

use axum::http::HeaderMap;

use crate::errors::AppError;

/// Operator endpoints require `Authorization: Bearer <ADMIN_TOKEN>`.
pub fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}
