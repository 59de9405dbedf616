pub mod stripe;
pub mod webhook;

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub org_id: String,
    pub plan: String,
    pub price_id: String,
    pub customer_id: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, AppError>;
}
