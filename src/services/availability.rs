use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{BusinessConfig, CalendarIntegration, NewEvent};
use crate::services::calendar::CalendarProvider;
use crate::services::scheduling::{
    self, AvailabilitySummary, DayAvailability, Interval, OpeningHours,
    DEFAULT_GRANULARITY_MINUTES,
};

#[derive(Debug, Clone, Default)]
pub struct SlotQuery {
    pub date: NaiveDate,
    pub service: Option<String>,
    pub duration_minutes: Option<u32>,
    pub location: Option<String>,
    pub granularity_minutes: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotsResponse {
    pub date: NaiveDate,
    pub timezone: String,
    pub duration_minutes: u32,
    pub granularity_minutes: u32,
    pub free: Vec<Interval>,
    pub slots: Vec<DateTime<Utc>>,
    /// Slot starts as local wall-clock times, e.g. "09:30".
    pub local_times: Vec<String>,
}

fn credentials(config: &BusinessConfig) -> Result<&CalendarIntegration, AppError> {
    config
        .calendar()
        .ok_or_else(|| AppError::Config("calendar is not connected for this agent".to_string()))
}

/// Event counts for the 7 days starting today in the business's timezone.
pub async fn week_summary(
    calendar: &dyn CalendarProvider,
    config: &BusinessConfig,
    now: DateTime<Utc>,
) -> Result<AvailabilitySummary, AppError> {
    let creds = credentials(config)?;
    let tz = config.timezone();
    let today = now.with_timezone(&tz).date_naive();
    let (start, end) = scheduling::summary_range(tz, today)
        .ok_or_else(|| AppError::Validation(format!("cannot compute window for {today}")))?;

    let events = calendar.list_events(creds, start, end).await?;
    Ok(scheduling::summarize_week(tz, today, &events))
}

/// Resolve the service duration: an explicit duration wins, then the named service.
fn requested_duration(config: &BusinessConfig, query: &SlotQuery) -> Result<u32, AppError> {
    if let Some(minutes) = query.duration_minutes {
        return Ok(minutes);
    }
    match &query.service {
        Some(name) => config
            .service(name)
            .map(|s| s.duration_minutes)
            .ok_or_else(|| AppError::Validation(format!("unknown service: {name}"))),
        None => config
            .services
            .first()
            .map(|s| s.duration_minutes)
            .ok_or_else(|| {
                AppError::Validation("duration_minutes or service is required".to_string())
            }),
    }
}

fn opening_hours(config: &BusinessConfig, location: Option<&str>) -> Result<OpeningHours, AppError> {
    OpeningHours::for_location(config, location).ok_or_else(|| {
        AppError::Validation(format!("unknown location: {}", location.unwrap_or_default()))
    })
}

async fn resolve_day(
    calendar: &dyn CalendarProvider,
    config: &BusinessConfig,
    opening: &OpeningHours,
    date: NaiveDate,
    duration: u32,
    granularity: u32,
) -> Result<DayAvailability, AppError> {
    let creds = credentials(config)?;
    let (start, end) = scheduling::day_bounds(opening.timezone, date)
        .ok_or_else(|| AppError::Validation(format!("invalid date: {date}")))?;
    let events = calendar.list_events(creds, start, end).await?;
    Ok(scheduling::resolve_slots(
        date,
        opening,
        &events,
        duration,
        granularity,
    ))
}

/// Open slots for one day, computed from the live calendar.
pub async fn day_slots(
    calendar: &dyn CalendarProvider,
    config: &BusinessConfig,
    query: &SlotQuery,
) -> Result<SlotsResponse, AppError> {
    let duration = requested_duration(config, query)?;
    let granularity = query
        .granularity_minutes
        .unwrap_or(DEFAULT_GRANULARITY_MINUTES);
    let opening = opening_hours(config, query.location.as_deref())?;

    let day = resolve_day(calendar, config, &opening, query.date, duration, granularity).await?;

    let tz = opening.timezone;
    Ok(SlotsResponse {
        date: query.date,
        timezone: tz.name().to_string(),
        duration_minutes: duration,
        granularity_minutes: granularity,
        local_times: day
            .slots
            .iter()
            .map(|s| s.with_timezone(&tz).format("%H:%M").to_string())
            .collect(),
        free: day.free,
        slots: day.slots,
    })
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub start: DateTime<Utc>,
    pub service: Option<String>,
    pub duration_minutes: Option<u32>,
    pub location: Option<String>,
    pub summary: String,
    pub description: Option<String>,
}

/// Insert an event after checking the requested time is still open.
pub async fn book(
    calendar: &dyn CalendarProvider,
    config: &BusinessConfig,
    request: &BookingRequest,
) -> Result<crate::models::CalendarEvent, AppError> {
    let opening = opening_hours(config, request.location.as_deref())?;
    let duration = requested_duration(
        config,
        &SlotQuery {
            date: request.start.with_timezone(&opening.timezone).date_naive(),
            service: request.service.clone(),
            duration_minutes: request.duration_minutes,
            ..Default::default()
        },
    )?;
    let date = request.start.with_timezone(&opening.timezone).date_naive();

    let day = resolve_day(
        calendar,
        config,
        &opening,
        date,
        duration,
        DEFAULT_GRANULARITY_MINUTES,
    )
    .await?;
    scheduling::validate_booking_time(request.start, duration, &opening, &day)
        .map_err(|e| AppError::Conflict(e.to_string()))?;

    let event = NewEvent {
        start: request.start,
        end: request.start + Duration::minutes(duration as i64),
        timezone: opening.timezone.name().to_string(),
        summary: request.summary.clone(),
        description: request.description.clone(),
    };
    let created = calendar.insert_event(credentials(config)?, &event).await?;
    tracing::info!(start = %event.start, duration, "appointment booked");
    Ok(created)
}
