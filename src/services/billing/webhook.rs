use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use crate::errors::AppError;
use crate::models::{PlanUpdate, FREE_PLAN};

/// Maximum age of a signed webhook, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verify a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=...]`) over the raw body.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now: i64,
) -> Result<(), AppError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse().ok(),
            Some(("v1", v)) => signatures.push(v),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(AppError::InvalidSignature)?;
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        tracing::warn!(timestamp, now, "stripe signature outside tolerance");
        return Err(AppError::InvalidSignature);
    }

    let valid = signatures.iter().any(|sig| {
        let Ok(expected) = hex::decode(sig) else {
            return false;
        };
        let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    });

    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidSignature)
    }
}

/// Test tooling: build the `Stripe-Signature` header Stripe would send for
/// `payload`. The server only ever verifies; this exists for test suites and
/// local replay of captured events.
pub fn sign(secret: &str, payload: &[u8], timestamp: i64) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return format!("t={timestamp}"),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: Value,
}

/// A plan change derived from a subscription lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingChange {
    /// Organization named by the event; when absent the owner is looked up by customer.
    pub org_id: Option<String>,
    pub customer_id: Option<String>,
    pub update: PlanUpdate,
}

fn str_field(obj: &Value, key: &str) -> Option<String> {
    obj[key].as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

/// Map an event onto a plan change. `None` for event types that carry no plan information.
pub fn billing_change(event: &StripeEvent) -> Option<BillingChange> {
    let obj = &event.data.object;
    let metadata = &obj["metadata"];
    let customer_id = str_field(obj, "customer");

    match event.kind.as_str() {
        "checkout.session.completed" => Some(BillingChange {
            org_id: str_field(metadata, "org_id").or_else(|| str_field(obj, "client_reference_id")),
            customer_id: customer_id.clone(),
            update: PlanUpdate {
                plan: str_field(metadata, "plan"),
                stripe_customer_id: customer_id,
                stripe_subscription_id: str_field(obj, "subscription"),
                subscription_status: Some("active".to_string()),
            },
        }),
        "customer.subscription.created" | "customer.subscription.updated" => {
            let status = str_field(obj, "status");
            let plan = match status.as_deref() {
                Some("active") | Some("trialing") => str_field(metadata, "plan"),
                Some("canceled") | Some("unpaid") | Some("incomplete_expired") => {
                    Some(FREE_PLAN.to_string())
                }
                _ => None,
            };
            Some(BillingChange {
                org_id: str_field(metadata, "org_id"),
                customer_id: customer_id.clone(),
                update: PlanUpdate {
                    plan,
                    stripe_customer_id: customer_id,
                    stripe_subscription_id: str_field(obj, "id"),
                    subscription_status: status,
                },
            })
        }
        "customer.subscription.deleted" => Some(BillingChange {
            org_id: str_field(metadata, "org_id"),
            customer_id: customer_id.clone(),
            update: PlanUpdate {
                plan: Some(FREE_PLAN.to_string()),
                stripe_customer_id: customer_id,
                stripe_subscription_id: str_field(obj, "id"),
                subscription_status: Some("canceled".to_string()),
            },
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_750_000_000;

    #[test]
    fn test_valid_signature() {
        let body = br#"{"id":"evt_1"}"#;
        let header = sign(SECRET, body, NOW);
        assert!(verify_signature(SECRET, &header, body, NOW + 10).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let header = sign(SECRET, br#"{"id":"evt_1"}"#, NOW);
        assert!(verify_signature(SECRET, &header, br#"{"id":"evt_2"}"#, NOW).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let body = br#"{"id":"evt_1"}"#;
        let header = sign("whsec_other", body, NOW);
        assert!(verify_signature(SECRET, &header, body, NOW).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let body = br#"{"id":"evt_1"}"#;
        let header = sign(SECRET, body, NOW);
        assert!(verify_signature(SECRET, &header, body, NOW + SIGNATURE_TOLERANCE_SECS + 1).is_err());
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(verify_signature(SECRET, "garbage", b"{}", NOW).is_err());
        assert!(verify_signature(SECRET, &format!("t={NOW},v1=zz"), b"{}", NOW).is_err());
    }

    #[test]
    fn test_any_v1_signature_may_match() {
        let body = br#"{"id":"evt_1"}"#;
        let good = sign(SECRET, body, NOW);
        let v1 = good.split_once(",v1=").unwrap().1;
        let header = format!("t={NOW},v1={},v1={v1}", "00".repeat(32));
        assert!(verify_signature(SECRET, &header, body, NOW).is_ok());
    }

    fn event(kind: &str, object: Value) -> StripeEvent {
        StripeEvent {
            id: "evt_1".to_string(),
            kind: kind.to_string(),
            data: EventData { object },
        }
    }

    #[test]
    fn test_checkout_completed_sets_plan() {
        let change = billing_change(&event(
            "checkout.session.completed",
            json!({
                "client_reference_id": "org1",
                "customer": "cus_1",
                "subscription": "sub_1",
                "metadata": {"plan": "pro"}
            }),
        ))
        .unwrap();
        assert_eq!(change.org_id.as_deref(), Some("org1"));
        assert_eq!(change.update.plan.as_deref(), Some("pro"));
        assert_eq!(change.update.stripe_subscription_id.as_deref(), Some("sub_1"));
    }

    #[test]
    fn test_past_due_subscription_keeps_plan() {
        let change = billing_change(&event(
            "customer.subscription.updated",
            json!({"id": "sub_1", "customer": "cus_1", "status": "past_due", "metadata": {"plan": "pro"}}),
        ))
        .unwrap();
        assert_eq!(change.update.plan, None);
        assert_eq!(change.update.subscription_status.as_deref(), Some("past_due"));
        assert_eq!(change.org_id, None);
    }

    #[test]
    fn test_deleted_subscription_reverts_to_free() {
        let change = billing_change(&event(
            "customer.subscription.deleted",
            json!({"id": "sub_1", "customer": "cus_1", "metadata": {"org_id": "org1"}}),
        ))
        .unwrap();
        assert_eq!(change.update.plan.as_deref(), Some(FREE_PLAN));
        assert_eq!(change.org_id.as_deref(), Some("org1"));
    }

    #[test]
    fn test_unrelated_event_ignored() {
        assert!(billing_change(&event("invoice.paid", json!({}))).is_none());
    }
}
