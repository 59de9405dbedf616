use async_trait::async_trait;
use serde::Serialize;

use super::EmailProvider;
use crate::errors::AppError;
use crate::services::upstream;

const SERVICE: &str = "email";

/// Sends mail through a JSON email API (`{from, to, subject, html}` with a bearer key).
pub struct HttpEmailService {
    api_url: String,
    api_key: String,
    from: String,
    client: reqwest::Client,
}

impl HttpEmailService {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            api_url,
            api_key,
            from,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct EmailPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[async_trait]
impl EmailProvider for HttpEmailService {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), AppError> {
        if self.api_key.is_empty() {
            return Err(AppError::Config("EMAIL_API_KEY is not set".to_string()));
        }

        let payload = EmailPayload {
            from: &self.from,
            to: [to],
            subject,
            html: html_body,
        };

        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::transport(SERVICE, e))?;

        if !resp.status().is_success() {
            return Err(upstream::error_from_response(SERVICE, resp).await);
        }

        tracing::info!(to, subject, "email sent");
        Ok(())
    }
}
