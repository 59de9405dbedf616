use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use agentdesk::config::AppConfig;
use agentdesk::db;
use agentdesk::routes;
use agentdesk::services::billing::stripe::StripeClient;
use agentdesk::services::calendar::google::GoogleCalendar;
use agentdesk::services::email::http::HttpEmailService;
use agentdesk::services::voice::vapi::VapiClient;
use agentdesk::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    if config.admin_token == "changeme" {
        tracing::warn!("ADMIN_TOKEN is not set, using the default token");
    }
    if config.vapi_webhook_secret.is_empty() {
        tracing::warn!("VAPI_WEBHOOK_SECRET is not set, voice webhooks are unauthenticated");
    }

    let conn = db::init_db(&config.database_url)?;

    let calendar = GoogleCalendar::new(config.google_calendar_base_url.clone());
    let voice = VapiClient::new(config.vapi_api_key.clone(), config.vapi_base_url.clone());
    let billing = StripeClient::new(
        config.stripe_secret_key.clone(),
        config.stripe_base_url.clone(),
    );
    let email = HttpEmailService::new(
        config.email_api_url.clone(),
        config.email_api_key.clone(),
        config.email_from.clone(),
    );

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        calendar: Box::new(calendar),
        voice: Box::new(voice),
        billing: Box::new(billing),
        email: Box::new(email),
    });

    let app = routes::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
