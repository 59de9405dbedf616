pub mod business_config;
pub mod calendar_event;
pub mod call_log;
pub mod hours;
pub mod organization;

pub use business_config::{
    BillingIntegration, BusinessConfig, CalendarIntegration, Integrations, Location, Metadata,
    Policy, Resource, Service, VoiceIntegration,
};
pub use calendar_event::{CalendarEvent, EventTime, NewEvent};
pub use call_log::CallLog;
pub use hours::HoursWindow;
pub use organization::{Organization, PlanUpdate, FREE_PLAN};
