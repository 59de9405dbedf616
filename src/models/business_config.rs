use serde::{Deserialize, Serialize};

use super::hours::HoursWindow;

/// The per-(organization, agent) configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessConfig {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub policy: Policy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrations: Option<Integrations>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notification_email: Option<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            business_name: String::new(),
            industry: String::new(),
            description: String::new(),
            notification_email: None,
            timezone: default_timezone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default = "default_duration")]
    pub duration_minutes: u32,
    #[serde(default)]
    pub booking_rules: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Option<String>,
}

fn default_duration() -> u32 {
    30
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub hours: Vec<HoursWindow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub availability: Vec<HoursWindow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub greeting: String,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub faq: String,
    #[serde(default)]
    pub escalation: String,
    #[serde(default)]
    pub custom_instructions: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Integrations {
    #[serde(default)]
    pub calendar: Option<CalendarIntegration>,
    #[serde(default)]
    pub voice: Option<VoiceIntegration>,
    #[serde(default)]
    pub billing: Option<BillingIntegration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarIntegration {
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    #[serde(default)]
    pub access_token: String,
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceIntegration {
    #[serde(default)]
    pub assistant_id: String,
    #[serde(default)]
    pub phone_number_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingIntegration {
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
}

impl BusinessConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        for service in &self.services {
            if service.name.trim().is_empty() {
                anyhow::bail!("service name must not be empty");
            }
            if service.duration_minutes == 0 {
                anyhow::bail!("service {} has zero duration", service.name);
            }
        }
        for location in &self.locations {
            location
                .timezone
                .parse::<chrono_tz::Tz>()
                .map_err(|_| anyhow::anyhow!("invalid timezone: {}", location.timezone))?;
            for window in &location.hours {
                window.validate()?;
            }
        }
        for resource in &self.resources {
            for window in &resource.availability {
                window.validate()?;
            }
        }
        self.metadata
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| anyhow::anyhow!("invalid timezone: {}", self.metadata.timezone))?;
        Ok(())
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Named location, or the first configured one when no name is given.
    pub fn location(&self, name: Option<&str>) -> Option<&Location> {
        match name {
            Some(name) => self
                .locations
                .iter()
                .find(|l| l.name.eq_ignore_ascii_case(name.trim())),
            None => self.locations.first(),
        }
    }

    /// Calendar credentials, if a non-empty token is configured.
    pub fn calendar(&self) -> Option<&CalendarIntegration> {
        self.integrations
            .as_ref()?
            .calendar
            .as_ref()
            .filter(|c| !c.access_token.is_empty())
    }

    pub fn voice(&self) -> Option<&VoiceIntegration> {
        self.integrations.as_ref()?.voice.as_ref()
    }

    pub fn assistant_id(&self) -> Option<&str> {
        self.voice()
            .map(|v| v.assistant_id.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn timezone(&self) -> chrono_tz::Tz {
        self.metadata.timezone.parse().unwrap_or(chrono_tz::UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BusinessConfig {
        serde_json::from_value(serde_json::json!({
            "metadata": {"business_name": "Bob's Barbershop", "timezone": "America/New_York"},
            "services": [{"name": "Haircut", "duration_minutes": 45}],
            "locations": [{
                "name": "Main St",
                "timezone": "America/New_York",
                "hours": [{"day": "mon", "start": "09:00", "end": "17:00"}]
            }],
            "integrations": {"calendar": {"access_token": "tok"}}
        }))
        .unwrap()
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: BusinessConfig = serde_json::from_str("{}").unwrap();
        assert!(config.services.is_empty());
        assert_eq!(config.metadata.timezone, "UTC");
        assert!(config.integrations.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_service_lookup_is_case_insensitive() {
        let config = sample();
        assert_eq!(config.service("haircut").unwrap().duration_minutes, 45);
        assert!(config.service("shave").is_none());
    }

    #[test]
    fn test_location_defaults_to_first() {
        let config = sample();
        assert_eq!(config.location(None).unwrap().name, "Main St");
        assert!(config.location(Some("Elm St")).is_none());
    }

    #[test]
    fn test_calendar_requires_token() {
        let mut config = sample();
        assert_eq!(config.calendar().unwrap().calendar_id, "primary");
        config.integrations.as_mut().unwrap().calendar.as_mut().unwrap().access_token =
            String::new();
        assert!(config.calendar().is_none());
    }

    #[test]
    fn test_validate_rejects_bad_timezone() {
        let mut config = sample();
        config.locations[0].timezone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_duration() {
        let mut config = sample();
        config.services[0].duration_minutes = 0;
        assert!(config.validate().is_err());
    }
}
