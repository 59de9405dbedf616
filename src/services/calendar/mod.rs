pub mod google;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::{CalendarEvent, CalendarIntegration, NewEvent};

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Events overlapping `[start, end)`, recurring events expanded.
    async fn list_events(
        &self,
        creds: &CalendarIntegration,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, AppError>;

    async fn insert_event(
        &self,
        creds: &CalendarIntegration,
        event: &NewEvent,
    ) -> Result<CalendarEvent, AppError>;
}
