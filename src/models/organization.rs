use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const FREE_PLAN: &str = "free";

/// Billing state for an organization. Written by the payments webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub plan: String,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub subscription_status: Option<String>,
    pub updated_at: NaiveDateTime,
}

/// A change to an organization's billing fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanUpdate {
    pub plan: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub subscription_status: Option<String>,
}
