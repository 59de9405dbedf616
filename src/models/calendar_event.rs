use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A timed instant or an all-day date, as the hosted calendar reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTime {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

/// An event owned by the hosted calendar. Never persisted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub link: Option<String>,
}

impl CalendarEvent {
    pub fn is_all_day(&self) -> bool {
        matches!(self.start, EventTime::Date(_))
    }

    /// Whether an all-day event covers `date`. All-day end dates are exclusive.
    pub fn covers_date(&self, date: NaiveDate) -> bool {
        match (&self.start, &self.end) {
            (EventTime::Date(start), EventTime::Date(end)) if end > start => {
                *start <= date && date < *end
            }
            (EventTime::Date(start), _) => *start == date,
            _ => false,
        }
    }

    /// Start/end instants for timed events.
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (&self.start, &self.end) {
            (EventTime::DateTime(start), EventTime::DateTime(end)) => Some((*start, *end)),
            _ => None,
        }
    }
}

/// A new event to insert into the hosted calendar.
#[derive(Debug, Clone, Serialize)]
pub struct NewEvent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone: String,
    pub summary: String,
    pub description: Option<String>,
}
