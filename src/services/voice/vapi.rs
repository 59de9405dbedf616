use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use super::{CallStarted, OutboundCall, RemoteAssistant, VoicePlatform};
use crate::errors::AppError;
use crate::services::upstream;

const SERVICE: &str = "vapi";

pub struct VapiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl VapiClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn api_key(&self) -> Result<&str, AppError> {
        if self.api_key.is_empty() {
            return Err(AppError::Config("VAPI_API_KEY is not set".to_string()));
        }
        Ok(&self.api_key)
    }

    async fn read_json(resp: reqwest::Response) -> Result<Value, AppError> {
        if !resp.status().is_success() {
            return Err(upstream::error_from_response(SERVICE, resp).await);
        }
        resp.json().await.map_err(|e| AppError::transport(SERVICE, e))
    }
}

fn to_assistant(body: Value) -> Result<RemoteAssistant, AppError> {
    let id = body["id"]
        .as_str()
        .ok_or_else(|| AppError::Upstream {
            service: SERVICE,
            status: 502,
            message: "assistant response has no id".to_string(),
        })?
        .to_string();
    let version = body["updatedAt"].as_str().map(str::to_string);
    Ok(RemoteAssistant { id, body, version })
}

#[async_trait]
impl VoicePlatform for VapiClient {
    async fn get_assistant(&self, assistant_id: &str) -> Result<RemoteAssistant, AppError> {
        let resp = self
            .client
            .get(format!("{}/assistant/{assistant_id}", self.base_url))
            .bearer_auth(self.api_key()?)
            .send()
            .await
            .map_err(|e| AppError::transport(SERVICE, e))?;

        to_assistant(Self::read_json(resp).await?)
    }

    async fn update_assistant(
        &self,
        assistant_id: &str,
        patch: &Value,
        expected_version: Option<&str>,
    ) -> Result<RemoteAssistant, AppError> {
        let mut req = self
            .client
            .patch(format!("{}/assistant/{assistant_id}", self.base_url))
            .bearer_auth(self.api_key()?)
            .json(patch);
        if let Some(version) = expected_version {
            req = req.header(reqwest::header::IF_MATCH, version);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| AppError::transport(SERVICE, e))?;

        if matches!(
            resp.status(),
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED
        ) {
            return Err(AppError::Conflict(format!(
                "assistant {assistant_id} was modified concurrently"
            )));
        }

        to_assistant(Self::read_json(resp).await?)
    }

    async fn create_call(&self, call: &OutboundCall) -> Result<CallStarted, AppError> {
        let resp = self
            .client
            .post(format!("{}/call", self.base_url))
            .bearer_auth(self.api_key()?)
            .json(call)
            .send()
            .await
            .map_err(|e| AppError::transport(SERVICE, e))?;

        let body = Self::read_json(resp).await?;
        Ok(CallStarted {
            id: body["id"].as_str().unwrap_or_default().to_string(),
            status: body["status"].as_str().map(str::to_string),
        })
    }
}
