use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::BusinessConfig;
use crate::services::availability::{self, BookingRequest, SlotQuery};
use crate::services::calendar::CalendarProvider;
use crate::services::provisioning::{BOOK_APPOINTMENT, CHECK_AVAILABILITY};
use crate::services::scheduling::{self, OpeningHours};

#[derive(Debug, Deserialize)]
struct CheckAvailabilityArgs {
    date: String,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    duration_minutes: Option<u32>,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BookAppointmentArgs {
    start: String,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    duration_minutes: Option<u32>,
    #[serde(default)]
    location: Option<String>,
    customer_name: String,
    #[serde(default)]
    customer_phone: Option<String>,
}

/// Tool arguments arrive either as an object or as a JSON-encoded string.
fn parse_args<T: for<'de> Deserialize<'de>>(args: &Value) -> Result<T, AppError> {
    let parsed = match args {
        Value::String(s) => serde_json::from_str(s),
        other => serde_json::from_value(other.clone()),
    };
    parsed.map_err(|e| AppError::Validation(format!("invalid tool arguments: {e}")))
}

fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("date must be YYYY-MM-DD: {s}")))
}

fn parse_local_start(s: &str) -> Result<NaiveDateTime, AppError> {
    let s = s.trim();
    ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| AppError::Validation(format!("start must be YYYY-MM-DD HH:MM: {s}")))
}

/// Run one voice-agent tool call and return the text handed back to the agent.
/// Failures are reported to the agent as text rather than propagated.
pub async fn run_tool(
    calendar: &dyn CalendarProvider,
    config: &BusinessConfig,
    name: &str,
    args: &Value,
) -> String {
    let result = match name {
        CHECK_AVAILABILITY => check_availability(calendar, config, args).await,
        BOOK_APPOINTMENT => book_appointment(calendar, config, args).await,
        other => Err(AppError::Validation(format!("unknown tool: {other}"))),
    };

    result.unwrap_or_else(|e| {
        tracing::warn!(tool = name, error = %e, "tool call failed");
        match e {
            AppError::Conflict(msg) => msg,
            AppError::Validation(msg) => msg,
            _ => "Sorry, I couldn't reach the calendar just now.".to_string(),
        }
    })
}

async fn check_availability(
    calendar: &dyn CalendarProvider,
    config: &BusinessConfig,
    args: &Value,
) -> Result<String, AppError> {
    let args: CheckAvailabilityArgs = parse_args(args)?;
    let query = SlotQuery {
        date: parse_date(&args.date)?,
        service: args.service,
        duration_minutes: args.duration_minutes,
        location: args.location,
        granularity_minutes: None,
    };
    let slots = availability::day_slots(calendar, config, &query).await?;

    if slots.local_times.is_empty() {
        return Ok(format!("There are no openings on {}.", query.date));
    }
    Ok(format!(
        "Available start times on {} ({}): {}",
        query.date,
        slots.timezone,
        slots.local_times.join(", ")
    ))
}

async fn book_appointment(
    calendar: &dyn CalendarProvider,
    config: &BusinessConfig,
    args: &Value,
) -> Result<String, AppError> {
    let args: BookAppointmentArgs = parse_args(args)?;
    let opening = OpeningHours::for_location(config, args.location.as_deref())
        .ok_or_else(|| AppError::Validation("unknown location".to_string()))?;
    let local = parse_local_start(&args.start)?;
    let start = scheduling::local_to_utc(opening.timezone, local)
        .ok_or_else(|| AppError::Validation(format!("invalid local time: {local}")))?;

    let service = args.service.clone().unwrap_or_else(|| "Appointment".to_string());
    let mut description = format!("Booked by phone agent for {}", args.customer_name);
    if let Some(phone) = &args.customer_phone {
        description.push_str(&format!(" ({phone})"));
    }

    availability::book(
        calendar,
        config,
        &BookingRequest {
            start,
            service: args.service,
            duration_minutes: args.duration_minutes,
            location: args.location,
            summary: format!("{service}: {}", args.customer_name),
            description: Some(description),
        },
    )
    .await?;

    Ok(format!(
        "Booked {service} for {} at {}.",
        args.customer_name,
        local.format("%Y-%m-%d %H:%M")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_args_from_string_or_object() {
        let from_obj: CheckAvailabilityArgs = parse_args(&json!({"date": "2025-06-16"})).unwrap();
        let from_str: CheckAvailabilityArgs =
            parse_args(&json!("{\"date\":\"2025-06-16\",\"service\":\"Haircut\"}")).unwrap();
        assert_eq!(from_obj.date, "2025-06-16");
        assert_eq!(from_str.service.as_deref(), Some("Haircut"));
    }

    #[test]
    fn test_parse_local_start_formats() {
        assert!(parse_local_start("2025-06-16 09:30").is_ok());
        assert!(parse_local_start("2025-06-16T09:30").is_ok());
        assert!(parse_local_start("2025-06-16T09:30:00").is_ok());
        assert!(parse_local_start("tomorrow at 9").is_err());
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("2025-06-16").is_ok());
        assert!(parse_date("16/06/2025").is_err());
    }
}
