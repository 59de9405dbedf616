use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::hours;
use crate::models::BusinessConfig;
use crate::services::voice::VoicePlatform;

pub const CHECK_AVAILABILITY: &str = "check_availability";
pub const BOOK_APPOINTMENT: &str = "book_appointment";
const PROVISIONED_TOOLS: [&str; 2] = [CHECK_AVAILABILITY, BOOK_APPOINTMENT];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProvisionReport {
    pub assistant_id: String,
    pub updated: Vec<String>,
    pub missing: Vec<String>,
    pub version: Option<String>,
}

/// Parameter schema for one of the provisioned tools.
pub fn tool_parameters(tool: &str, config: &BusinessConfig) -> Value {
    let mut service = json!({
        "type": "string",
        "description": "Name of the requested service",
    });
    let names: Vec<&str> = config.services.iter().map(|s| s.name.as_str()).collect();
    if !names.is_empty() {
        service["enum"] = json!(names);
    }

    let mut location = json!({
        "type": "string",
        "description": "Location the customer wants to visit",
    });
    let locations: Vec<&str> = config.locations.iter().map(|l| l.name.as_str()).collect();
    if !locations.is_empty() {
        location["enum"] = json!(locations);
    }

    let duration = json!({
        "type": "integer",
        "description": "Appointment length in minutes, when it differs from the service's usual length",
        "minimum": 1,
    });

    match tool {
        CHECK_AVAILABILITY => json!({
            "type": "object",
            "properties": {
                "date": {
                    "type": "string",
                    "description": "Day to check, formatted YYYY-MM-DD",
                },
                "service": service,
                "duration_minutes": duration,
                "location": location,
            },
            "required": ["date"],
        }),
        BOOK_APPOINTMENT => json!({
            "type": "object",
            "properties": {
                "start": {
                    "type": "string",
                    "description": "Appointment start, formatted YYYY-MM-DD HH:MM in the business's local time",
                },
                "service": service,
                "duration_minutes": duration,
                "location": location,
                "customer_name": {"type": "string"},
                "customer_phone": {"type": "string"},
            },
            "required": ["start", "customer_name"],
        }),
        _ => json!({"type": "object", "properties": {}}),
    }
}

/// System prompt for the voice agent, rendered from the config.
pub fn system_prompt(config: &BusinessConfig) -> String {
    let meta = &config.metadata;
    let policy = &config.policy;
    let name = if meta.business_name.is_empty() {
        "the business"
    } else {
        meta.business_name.as_str()
    };

    let mut prompt = format!("You are the phone receptionist for {name}.");
    if !meta.industry.is_empty() {
        prompt.push_str(&format!(" Industry: {}.", meta.industry));
    }
    if !meta.description.is_empty() {
        prompt.push_str(&format!("\n\nAbout the business: {}", meta.description));
    }

    if !config.services.is_empty() {
        prompt.push_str("\n\nServices:");
        for s in &config.services {
            prompt.push_str(&format!("\n- {} ({} min)", s.name, s.duration_minutes));
            if let Some(price) = &s.price {
                prompt.push_str(&format!(", {price}"));
            }
            if !s.description.is_empty() {
                prompt.push_str(&format!(": {}", s.description));
            }
            if !s.booking_rules.is_empty() {
                prompt.push_str(&format!(" Booking rules: {}", s.booking_rules));
            }
        }
    }

    if !config.locations.is_empty() {
        prompt.push_str("\n\nLocations:");
        for l in &config.locations {
            prompt.push_str(&format!("\n- {}", l.name));
            if !l.address.is_empty() {
                prompt.push_str(&format!(", {}", l.address));
            }
            let hours = hours::to_human_readable(&l.hours);
            if !hours.is_empty() {
                prompt.push_str(&format!(" ({hours}, {})", l.timezone));
            }
        }
    }

    if !config.resources.is_empty() {
        prompt.push_str("\n\nStaff:");
        for r in &config.resources {
            prompt.push_str(&format!("\n- {}", r.name));
            if !r.role.is_empty() {
                prompt.push_str(&format!(" ({})", r.role));
            }
        }
    }

    for (label, text) in [
        ("Greeting", &policy.greeting),
        ("Tone", &policy.tone),
        ("Frequently asked questions", &policy.faq),
        ("Escalation", &policy.escalation),
        ("Additional instructions", &policy.custom_instructions),
    ] {
        if !text.trim().is_empty() {
            prompt.push_str(&format!("\n\n{label}: {}", text.trim()));
        }
    }

    prompt.push_str(&format!(
        "\n\nAlways call {CHECK_AVAILABILITY} before offering a time and {BOOK_APPOINTMENT} to confirm it."
    ));
    prompt
}

/// Rewrite the assistant's `model` in place: overwrite the parameters of the
/// provisioned tools and replace the system message.
pub fn apply_config(model: &mut Value, config: &BusinessConfig) -> (Vec<String>, Vec<String>) {
    let mut updated = Vec::new();

    if let Some(tools) = model.get_mut("tools").and_then(Value::as_array_mut) {
        for tool in tools.iter_mut() {
            let Some(function) = tool.get_mut("function").filter(|f| f.is_object()) else {
                continue;
            };
            let Some(name) = function["name"].as_str().map(str::to_string) else {
                continue;
            };
            if PROVISIONED_TOOLS.contains(&name.as_str()) {
                function["parameters"] = tool_parameters(&name, config);
                updated.push(name);
            }
        }
    }

    let missing = PROVISIONED_TOOLS
        .iter()
        .filter(|t| !updated.iter().any(|u| u == *t))
        .map(|t| t.to_string())
        .collect();

    let system = json!({"role": "system", "content": system_prompt(config)});
    match model.get_mut("messages").and_then(Value::as_array_mut) {
        Some(messages) => match messages.iter_mut().find(|m| m["role"] == "system") {
            Some(existing) => *existing = system,
            None => messages.insert(0, system),
        },
        None => {
            if let Some(obj) = model.as_object_mut() {
                obj.insert("messages".to_string(), json!([system]));
            }
        }
    }

    (updated, missing)
}

/// Read the remote assistant, rewrite its model from `config`, and write it
/// back conditioned on the version that was read.
pub async fn provision(
    voice: &dyn VoicePlatform,
    config: &BusinessConfig,
) -> Result<ProvisionReport, AppError> {
    let assistant_id = config
        .assistant_id()
        .ok_or_else(|| AppError::Config("integrations.voice.assistant_id is not set".to_string()))?;

    let remote = voice.get_assistant(assistant_id).await?;

    let mut model = remote.body.get("model").cloned().ok_or_else(|| AppError::Upstream {
        service: "vapi",
        status: 502,
        message: format!("assistant {assistant_id} has no model"),
    })?;

    let (updated, missing) = apply_config(&mut model, config);
    if !missing.is_empty() {
        tracing::warn!(assistant_id, ?missing, "provisioned tools not found on assistant");
    }
    if remote.version.is_none() {
        tracing::warn!(assistant_id, "assistant has no version token, writing unconditionally");
    }

    let written = voice
        .update_assistant(
            assistant_id,
            &json!({ "model": model }),
            remote.version.as_deref(),
        )
        .await?;

    tracing::info!(assistant_id, ?updated, "assistant provisioned");

    Ok(ProvisionReport {
        assistant_id: assistant_id.to_string(),
        updated,
        missing,
        version: written.version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BusinessConfig {
        serde_json::from_value(json!({
            "metadata": {"business_name": "Bob's Barbershop", "industry": "barber"},
            "services": [
                {"name": "Haircut", "duration_minutes": 30, "price": "$25"},
                {"name": "Shave", "duration_minutes": 15}
            ],
            "locations": [{
                "name": "Main St",
                "hours": [{"day": "mon", "start": "09:00", "end": "17:00"}]
            }],
            "policy": {"tone": "friendly", "escalation": "Transfer to Bob"}
        }))
        .unwrap()
    }

    fn model() -> Value {
        json!({
            "provider": "openai",
            "model": "gpt-4o",
            "messages": [{"role": "system", "content": "old prompt"}],
            "tools": [
                {"type": "function", "function": {"name": "check_availability", "parameters": {}}},
                {"type": "function", "function": {"name": "transfer_call", "parameters": {"x": 1}}}
            ]
        })
    }

    #[test]
    fn test_tool_parameters_enumerate_services() {
        let params = tool_parameters(CHECK_AVAILABILITY, &config());
        assert_eq!(params["properties"]["service"]["enum"], json!(["Haircut", "Shave"]));
        assert_eq!(params["required"], json!(["date"]));
    }

    #[test]
    fn test_tool_parameters_accept_duration() {
        for tool in [CHECK_AVAILABILITY, BOOK_APPOINTMENT] {
            let params = tool_parameters(tool, &config());
            assert_eq!(params["properties"]["duration_minutes"]["type"], "integer");
        }
    }

    #[test]
    fn test_tool_parameters_without_services_has_no_enum() {
        let params = tool_parameters(BOOK_APPOINTMENT, &BusinessConfig::default());
        assert!(params["properties"]["service"].get("enum").is_none());
    }

    #[test]
    fn test_apply_config_overwrites_only_named_tools() {
        let mut model = model();
        let (updated, missing) = apply_config(&mut model, &config());

        assert_eq!(updated, vec![CHECK_AVAILABILITY.to_string()]);
        assert_eq!(missing, vec![BOOK_APPOINTMENT.to_string()]);
        assert_eq!(
            model["tools"][0]["function"]["parameters"]["properties"]["service"]["enum"],
            json!(["Haircut", "Shave"])
        );
        assert_eq!(model["tools"][1]["function"]["parameters"], json!({"x": 1}));
        assert_eq!(model["model"], "gpt-4o");
    }

    #[test]
    fn test_apply_config_replaces_system_message() {
        let mut model = model();
        apply_config(&mut model, &config());
        let messages = model["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        let content = messages[0]["content"].as_str().unwrap();
        assert!(content.contains("Bob's Barbershop"));
        assert!(!content.contains("old prompt"));
    }

    #[test]
    fn test_apply_config_adds_messages_when_absent() {
        let mut model = json!({"tools": []});
        apply_config(&mut model, &config());
        assert_eq!(model["messages"][0]["role"], "system");
    }

    #[test]
    fn test_system_prompt_includes_config() {
        let prompt = system_prompt(&config());
        assert!(prompt.contains("- Haircut (30 min), $25"));
        assert!(prompt.contains("Main St (Mon: 09:00-17:00, UTC)"));
        assert!(prompt.contains("Tone: friendly"));
        assert!(prompt.contains("Escalation: Transfer to Bob"));
        assert!(!prompt.contains("Greeting:"));
    }
}
