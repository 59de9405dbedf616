use crate::errors::AppError;

/// Turn a non-success response into an `Upstream` error, keeping the remote
/// status and the most specific message the body offers.
pub async fn error_from_response(service: &'static str, resp: reqwest::Response) -> AppError {
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    AppError::Upstream {
        service,
        status,
        message: extract_message(&text),
    }
}

fn extract_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    let message = &json["error"]["message"];
    if let Some(msg) = message.as_str() {
        return msg.to_string();
    }
    if let Some(msg) = json["message"].as_str() {
        return msg.to_string();
    }
    if let Some(msgs) = json["message"].as_array() {
        return msgs
            .iter()
            .filter_map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join("; ");
    }
    if let Some(msg) = json["error"].as_str() {
        return msg.to_string();
    }
    body.trim().to_string()
}
