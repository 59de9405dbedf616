use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallLog {
    pub id: String,
    pub org_id: String,
    pub agent_id: String,
    pub call_id: Option<String>,
    pub customer_number: Option<String>,
    pub summary: String,
    pub transcript: String,
    pub ended_reason: Option<String>,
    pub duration_seconds: Option<f64>,
    pub email_sent: bool,
    pub created_at: NaiveDateTime,
}
