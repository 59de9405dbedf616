use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;

use super::CalendarProvider;
use crate::errors::AppError;
use crate::models::{CalendarEvent, CalendarIntegration, EventTime, NewEvent};
use crate::services::upstream;

const SERVICE: &str = "google calendar";

pub struct GoogleCalendar {
    base_url: String,
    client: reqwest::Client,
}

impl GoogleCalendar {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn events_url(&self, calendar_id: &str) -> Result<reqwest::Url, AppError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| AppError::Config(format!("invalid calendar base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Config("calendar base url cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(["calendars", calendar_id, "events"]);
        Ok(url)
    }
}

#[derive(Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<GoogleEvent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    html_link: Option<String>,
    start: Option<GoogleTime>,
    end: Option<GoogleTime>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTime {
    #[serde(default)]
    date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    date: Option<NaiveDate>,
}

impl GoogleTime {
    fn into_event_time(self) -> Option<EventTime> {
        match (self.date_time, self.date) {
            (Some(dt), _) => Some(EventTime::DateTime(dt)),
            (None, Some(d)) => Some(EventTime::Date(d)),
            (None, None) => None,
        }
    }
}

impl GoogleEvent {
    fn into_event(self) -> Option<CalendarEvent> {
        if self.status.as_deref() == Some("cancelled") {
            return None;
        }
        Some(CalendarEvent {
            start: self.start?.into_event_time()?,
            end: self.end?.into_event_time()?,
            summary: self.summary.unwrap_or_default(),
            link: self.html_link,
        })
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendar {
    async fn list_events(
        &self,
        creds: &CalendarIntegration,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, AppError> {
        let url = self.events_url(&creds.calendar_id)?;
        let time_min = start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max = end.to_rfc3339_opts(SecondsFormat::Secs, true);

        let resp = self
            .client
            .get(url)
            .bearer_auth(&creds.access_token)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", "250"),
            ])
            .send()
            .await
            .map_err(|e| AppError::transport(SERVICE, e))?;

        if !resp.status().is_success() {
            return Err(upstream::error_from_response(SERVICE, resp).await);
        }

        let list: EventList = resp
            .json()
            .await
            .map_err(|e| AppError::transport(SERVICE, e))?;

        let events: Vec<CalendarEvent> = list
            .items
            .into_iter()
            .filter_map(GoogleEvent::into_event)
            .collect();
        tracing::debug!(count = events.len(), "fetched calendar events");
        Ok(events)
    }

    async fn insert_event(
        &self,
        creds: &CalendarIntegration,
        event: &NewEvent,
    ) -> Result<CalendarEvent, AppError> {
        let url = self.events_url(&creds.calendar_id)?;
        let body = json!({
            "summary": event.summary,
            "description": event.description,
            "start": {
                "dateTime": event.start.to_rfc3339_opts(SecondsFormat::Secs, true),
                "timeZone": event.timezone,
            },
            "end": {
                "dateTime": event.end.to_rfc3339_opts(SecondsFormat::Secs, true),
                "timeZone": event.timezone,
            },
        });

        let resp = self
            .client
            .post(url)
            .bearer_auth(&creds.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::transport(SERVICE, e))?;

        if !resp.status().is_success() {
            return Err(upstream::error_from_response(SERVICE, resp).await);
        }

        let created: GoogleEvent = resp
            .json()
            .await
            .map_err(|e| AppError::transport(SERVICE, e))?;

        created.into_event().ok_or_else(|| AppError::Upstream {
            service: SERVICE,
            status: 502,
            message: "created event has no start/end".to_string(),
        })
    }
}
