//! Checks each configured collaborator and prints one line per check.
//! Exits with status 1 if any check failed.

use std::env;
use std::process::ExitCode;

use chrono::{Duration, Utc};

use agentdesk::config::AppConfig;
use agentdesk::db;
use agentdesk::models::CalendarIntegration;
use agentdesk::services::ai::gemini::GeminiProvider;
use agentdesk::services::ai::LlmProvider;
use agentdesk::services::calendar::google::GoogleCalendar;
use agentdesk::services::calendar::CalendarProvider;
use agentdesk::services::voice::vapi::VapiClient;
use agentdesk::services::voice::VoicePlatform;

enum Outcome {
    Ok(String),
    Skipped(&'static str),
    Failed(String),
}

fn report(name: &str, outcome: &Outcome) -> bool {
    match outcome {
        Outcome::Ok(detail) => {
            println!("✓ {name}: {detail}");
            true
        }
        Outcome::Skipped(reason) => {
            println!("- {name}: skipped ({reason})");
            true
        }
        Outcome::Failed(err) => {
            println!("✗ {name}: {err}");
            false
        }
    }
}

fn check_database(config: &AppConfig) -> Outcome {
    let result = db::init_db(&config.database_url).and_then(|conn| {
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM agent_configs", [], |row| row.get(0))?;
        Ok(count)
    });
    match result {
        Ok(count) => Outcome::Ok(format!("{} ({count} agent configs)", config.database_url)),
        Err(e) => Outcome::Failed(format!("{e:#}")),
    }
}

async fn check_voice(config: &AppConfig) -> Outcome {
    let Ok(assistant_id) = env::var("VAPI_ASSISTANT_ID") else {
        return Outcome::Skipped("VAPI_ASSISTANT_ID not set");
    };
    let client = VapiClient::new(config.vapi_api_key.clone(), config.vapi_base_url.clone());
    match client.get_assistant(&assistant_id).await {
        Ok(assistant) => Outcome::Ok(format!(
            "assistant {} (version {})",
            assistant.id,
            assistant.version.as_deref().unwrap_or("unknown")
        )),
        Err(e) => Outcome::Failed(e.to_string()),
    }
}

async fn check_calendar(config: &AppConfig) -> Outcome {
    let Ok(access_token) = env::var("GOOGLE_CALENDAR_TOKEN") else {
        return Outcome::Skipped("GOOGLE_CALENDAR_TOKEN not set");
    };
    let creds = CalendarIntegration {
        calendar_id: env::var("GOOGLE_CALENDAR_ID").unwrap_or_else(|_| "primary".to_string()),
        access_token,
    };
    let calendar = GoogleCalendar::new(config.google_calendar_base_url.clone());
    let now = Utc::now();
    match calendar.list_events(&creds, now, now + Duration::days(1)).await {
        Ok(events) => Outcome::Ok(format!("{} events in the next 24h", events.len())),
        Err(e) => Outcome::Failed(e.to_string()),
    }
}

async fn check_llm(config: &AppConfig) -> Outcome {
    if config.gemini_api_key.is_empty() {
        return Outcome::Skipped("GEMINI_API_KEY not set");
    }
    let llm = GeminiProvider::new(config.gemini_api_key.clone(), config.gemini_model.clone());
    match llm.generate("Reply with the single word: pong").await {
        Ok(text) => Outcome::Ok(format!("{} replied {:?}", config.gemini_model, text.trim())),
        Err(e) => Outcome::Failed(format!("{e:#}")),
    }
}

fn check_keys(config: &AppConfig) -> Outcome {
    let missing: Vec<&str> = [
        ("VAPI_API_KEY", &config.vapi_api_key),
        ("STRIPE_SECRET_KEY", &config.stripe_secret_key),
        ("STRIPE_WEBHOOK_SECRET", &config.stripe_webhook_secret),
        ("EMAIL_API_KEY", &config.email_api_key),
    ]
    .iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(name, _)| *name)
    .collect();

    if missing.is_empty() {
        Outcome::Ok("all set".to_string())
    } else {
        Outcome::Failed(format!("missing {}", missing.join(", ")))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = AppConfig::from_env();

    let checks = [
        ("environment", check_keys(&config)),
        ("database", check_database(&config)),
        ("voice platform", check_voice(&config).await),
        ("calendar", check_calendar(&config).await),
        ("gemini", check_llm(&config).await),
    ];

    let mut healthy = true;
    for (name, outcome) in &checks {
        healthy &= report(name, outcome);
    }

    if healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
