pub mod gemini;

use async_trait::async_trait;

/// Single-turn text generation. Only the diagnostics binary uses this.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}
