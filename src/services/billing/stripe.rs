use async_trait::async_trait;
use serde::Deserialize;

use super::{BillingProvider, CheckoutRequest, CheckoutSession};
use crate::errors::AppError;
use crate::services::upstream;

const SERVICE: &str = "stripe";

pub struct StripeClient {
    secret_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl StripeClient {
    pub fn new(secret_key: String, base_url: String) -> Self {
        Self {
            secret_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

fn checkout_form(request: &CheckoutRequest) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("mode", "subscription".to_string()),
        ("line_items[0][price]", request.price_id.clone()),
        ("line_items[0][quantity]", "1".to_string()),
        ("success_url", request.success_url.clone()),
        ("cancel_url", request.cancel_url.clone()),
        ("client_reference_id", request.org_id.clone()),
        ("metadata[org_id]", request.org_id.clone()),
        ("metadata[plan]", request.plan.clone()),
        ("subscription_data[metadata][org_id]", request.org_id.clone()),
        ("subscription_data[metadata][plan]", request.plan.clone()),
    ];
    if let Some(customer) = &request.customer_id {
        form.push(("customer", customer.clone()));
    }
    form
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, AppError> {
        if self.secret_key.is_empty() {
            return Err(AppError::Config("STRIPE_SECRET_KEY is not set".to_string()));
        }

        let resp = self
            .client
            .post(format!("{}/checkout/sessions", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&checkout_form(request))
            .send()
            .await
            .map_err(|e| AppError::transport(SERVICE, e))?;

        if !resp.status().is_success() {
            return Err(upstream::error_from_response(SERVICE, resp).await);
        }

        let session: SessionResponse = resp
            .json()
            .await
            .map_err(|e| AppError::transport(SERVICE, e))?;

        let url = session.url.ok_or_else(|| AppError::Upstream {
            service: SERVICE,
            status: 502,
            message: "checkout session has no url".to_string(),
        })?;

        tracing::info!(org_id = %request.org_id, plan = %request.plan, session = %session.id, "checkout session created");
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_form_carries_org_and_plan() {
        let form = checkout_form(&CheckoutRequest {
            org_id: "org1".to_string(),
            plan: "pro".to_string(),
            price_id: "price_pro".to_string(),
            customer_id: None,
            success_url: "https://app/ok".to_string(),
            cancel_url: "https://app/cancel".to_string(),
        });
        let get = |key: &str| form.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str());

        assert_eq!(get("mode"), Some("subscription"));
        assert_eq!(get("line_items[0][price]"), Some("price_pro"));
        assert_eq!(get("client_reference_id"), Some("org1"));
        assert_eq!(get("subscription_data[metadata][plan]"), Some("pro"));
        assert_eq!(get("customer"), None);
    }
}
