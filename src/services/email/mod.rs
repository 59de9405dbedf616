pub mod http;

use async_trait::async_trait;

use crate::errors::AppError;

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), AppError>;
}
