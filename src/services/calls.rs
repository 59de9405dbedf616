use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{BusinessConfig, CallLog};
use crate::services::voice::{CallCustomer, CallStarted, OutboundCall, VoicePlatform};
use crate::state::AppState;

pub async fn start_call(
    voice: &dyn VoicePlatform,
    config: &BusinessConfig,
    phone_number: &str,
    customer_name: Option<String>,
) -> Result<CallStarted, AppError> {
    let phone_number = phone_number.trim();
    if !phone_number.starts_with('+') || phone_number.len() < 8 {
        return Err(AppError::Validation(format!(
            "phone number must be in E.164 format: {phone_number}"
        )));
    }

    let assistant_id = config
        .assistant_id()
        .ok_or_else(|| AppError::Config("integrations.voice.assistant_id is not set".to_string()))?;
    let phone_number_id = config
        .voice()
        .map(|v| v.phone_number_id.as_str())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            AppError::Config("integrations.voice.phone_number_id is not set".to_string())
        })?;

    let call = OutboundCall {
        assistant_id: assistant_id.to_string(),
        phone_number_id: phone_number_id.to_string(),
        customer: CallCustomer {
            number: phone_number.to_string(),
            name: customer_name,
        },
    };
    let started = voice.create_call(&call).await?;
    tracing::info!(call_id = %started.id, assistant_id, "outbound call started");
    Ok(started)
}

/// The parts of an `end-of-call-report` message that are kept.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallReport {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub ended_reason: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub call: Option<ReportCall>,
    #[serde(default)]
    pub customer: Option<ReportCustomer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCall {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub customer: Option<ReportCustomer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportCustomer {
    #[serde(default)]
    pub number: Option<String>,
}

impl CallReport {
    fn customer_number(&self) -> Option<String> {
        self.customer
            .as_ref()
            .or_else(|| self.call.as_ref()?.customer.as_ref())
            .and_then(|c| c.number.clone())
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn summary_email(config: &BusinessConfig, log: &CallLog) -> (String, String) {
    let business = if config.metadata.business_name.is_empty() {
        "your business"
    } else {
        config.metadata.business_name.as_str()
    };
    let caller = log.customer_number.as_deref().unwrap_or("an unknown number");
    let subject = format!("Call summary for {business}: {caller}");

    let mut html = format!(
        "<h2>Call with {}</h2>",
        escape_html(caller)
    );
    if let Some(secs) = log.duration_seconds {
        html.push_str(&format!("<p>Duration: {}m {}s</p>", (secs as u64) / 60, (secs as u64) % 60));
    }
    if let Some(reason) = &log.ended_reason {
        html.push_str(&format!("<p>Ended: {}</p>", escape_html(reason)));
    }
    let summary = if log.summary.is_empty() {
        "No summary was produced for this call."
    } else {
        log.summary.as_str()
    };
    html.push_str(&format!("<h3>Summary</h3><p>{}</p>", escape_html(summary)));
    if !log.transcript.is_empty() {
        html.push_str(&format!(
            "<h3>Transcript</h3><pre>{}</pre>",
            escape_html(&log.transcript)
        ));
    }
    (subject, html)
}

/// Persist the report and email a summary to the business when it has a
/// notification address. An email failure is logged, not returned.
pub async fn record_report(
    state: &Arc<AppState>,
    org_id: &str,
    agent_id: &str,
    config: &BusinessConfig,
    report: CallReport,
) -> Result<CallLog, AppError> {
    let mut log = CallLog {
        id: uuid::Uuid::new_v4().to_string(),
        org_id: org_id.to_string(),
        agent_id: agent_id.to_string(),
        call_id: report.call.as_ref().and_then(|c| c.id.clone()),
        customer_number: report.customer_number(),
        summary: report.summary.unwrap_or_default(),
        transcript: report.transcript.unwrap_or_default(),
        ended_reason: report.ended_reason,
        duration_seconds: report.duration_seconds,
        email_sent: false,
        created_at: Utc::now().naive_utc(),
    };

    {
        let db = state.db()?;
        queries::insert_call_log(&db, &log)?;
    }

    let Some(to) = config
        .metadata
        .notification_email
        .as_deref()
        .filter(|e| !e.is_empty())
    else {
        tracing::info!(org_id, agent_id, "no notification email configured, skipping summary");
        return Ok(log);
    };

    let (subject, html) = summary_email(config, &log);
    match state.email.send(to, &subject, &html).await {
        Ok(()) => {
            let db = state.db()?;
            queries::mark_call_log_emailed(&db, &log.id)?;
            log.email_sent = true;
        }
        Err(e) => {
            tracing::error!(error = %e, org_id, agent_id, "failed to send call summary");
        }
    }

    Ok(log)
}
