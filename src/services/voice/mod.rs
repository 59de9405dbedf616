pub mod vapi;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::errors::AppError;

/// An assistant definition as fetched from the voice platform.
#[derive(Debug, Clone)]
pub struct RemoteAssistant {
    pub id: String,
    pub body: Value,
    /// Opaque version token (the platform's `updatedAt`), used as a write precondition.
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundCall {
    pub assistant_id: String,
    pub phone_number_id: String,
    pub customer: CallCustomer,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallCustomer {
    pub number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallStarted {
    pub id: String,
    pub status: Option<String>,
}

#[async_trait]
pub trait VoicePlatform: Send + Sync {
    async fn get_assistant(&self, assistant_id: &str) -> Result<RemoteAssistant, AppError>;

    /// Patch an assistant. With `expected_version` set the write only succeeds if
    /// the remote definition is unchanged since it was read; otherwise `Conflict`.
    async fn update_assistant(
        &self,
        assistant_id: &str,
        patch: &Value,
        expected_version: Option<&str>,
    ) -> Result<RemoteAssistant, AppError>;

    async fn create_call(&self, call: &OutboundCall) -> Result<CallStarted, AppError>;
}
