use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::BusinessConfig;

#[derive(Debug, Clone, Serialize)]
pub struct ConfigDocument {
    pub org_id: String,
    pub agent_id: String,
    pub version: i64,
    pub updated_at: NaiveDateTime,
    pub config: BusinessConfig,
}

/// Load a config. `Ok(None)` means no document exists for the pair.
pub fn load(
    conn: &Connection,
    org_id: &str,
    agent_id: &str,
) -> Result<Option<ConfigDocument>, AppError> {
    let Some(stored) = queries::get_config(conn, org_id, agent_id)? else {
        return Ok(None);
    };
    let config: BusinessConfig = serde_json::from_value(stored.data)
        .map_err(|e| AppError::Storage(anyhow::anyhow!("stored config is malformed: {e}")))?;
    Ok(Some(ConfigDocument {
        org_id: org_id.to_string(),
        agent_id: agent_id.to_string(),
        version: stored.version,
        updated_at: stored.updated_at,
        config,
    }))
}

/// Load a config or fail with `NotFound`.
pub fn require(conn: &Connection, org_id: &str, agent_id: &str) -> Result<BusinessConfig, AppError> {
    load(conn, org_id, agent_id)?
        .map(|doc| doc.config)
        .ok_or_else(|| AppError::NotFound(format!("config for {org_id}/{agent_id}")))
}

/// Merge `patch` into the stored document (creating it if absent) and return
/// the result. Fields missing from the patch are left untouched.
pub fn merge(
    conn: &Connection,
    org_id: &str,
    agent_id: &str,
    patch: &Value,
) -> Result<ConfigDocument, AppError> {
    if !patch.is_object() {
        return Err(AppError::Validation(
            "config update must be a JSON object".to_string(),
        ));
    }

    let tx = conn.unchecked_transaction()?;

    let mut data = queries::get_config(&tx, org_id, agent_id)?
        .map(|stored| stored.data)
        .unwrap_or_else(|| Value::Object(Default::default()));
    merge_value(&mut data, patch);

    let config: BusinessConfig = serde_json::from_value(data.clone())
        .map_err(|e| AppError::Validation(format!("invalid config: {e}")))?;
    config
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    // Webhooks are routed by assistant id, so it must name a single agent.
    if let Some(assistant_id) = config.assistant_id() {
        if let Some((other_org, other_agent)) =
            queries::find_other_agent_by_assistant(&tx, assistant_id, org_id, agent_id)?
        {
            return Err(AppError::Conflict(format!(
                "assistant {assistant_id} is already linked to {other_org}/{other_agent}"
            )));
        }
    }

    queries::put_config(&tx, org_id, agent_id, &data)?;
    tx.commit()?;

    tracing::info!(org_id, agent_id, "config updated");

    load(conn, org_id, agent_id)?
        .ok_or_else(|| AppError::Storage(anyhow::anyhow!("config vanished after write")))
}

/// Recursive merge: objects merge key by key, `null` deletes a key, anything
/// else (arrays included) replaces the target.
pub fn merge_value(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                if value.is_null() {
                    target.remove(key);
                    continue;
                }
                let nested = value.is_object() && target.get(key).is_some_and(Value::is_object);
                if !nested {
                    target.insert(key.clone(), value.clone());
                } else if let Some(existing) = target.get_mut(key) {
                    merge_value(existing, value);
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use serde_json::json;

    #[test]
    fn test_merge_value_preserves_untouched_fields() {
        let mut doc = json!({
            "services": [{"name": "Haircut"}],
            "locations": [{"name": "Main St"}],
            "metadata": {"business_name": "Bob's", "industry": "barber"}
        });
        merge_value(
            &mut doc,
            &json!({
                "services": [{"name": "Shave"}],
                "metadata": {"industry": "grooming"}
            }),
        );
        assert_eq!(doc["services"], json!([{"name": "Shave"}]));
        assert_eq!(doc["locations"], json!([{"name": "Main St"}]));
        assert_eq!(doc["metadata"]["business_name"], "Bob's");
        assert_eq!(doc["metadata"]["industry"], "grooming");
    }

    #[test]
    fn test_merge_value_null_removes_key() {
        let mut doc = json!({"integrations": {"calendar": {"access_token": "x"}}});
        merge_value(&mut doc, &json!({"integrations": {"calendar": null}}));
        assert_eq!(doc, json!({"integrations": {}}));
    }

    #[test]
    fn test_merge_creates_then_preserves() {
        let conn = db::init_db(":memory:").unwrap();
        merge(
            &conn,
            "org1",
            "agent1",
            &json!({
                "services": [{"name": "Haircut", "duration_minutes": 30}],
                "locations": [{"name": "Main St", "timezone": "UTC"}]
            }),
        )
        .unwrap();

        let doc = merge(
            &conn,
            "org1",
            "agent1",
            &json!({"services": [{"name": "Beard trim", "duration_minutes": 15}]}),
        )
        .unwrap();

        assert_eq!(doc.version, 2);
        assert_eq!(doc.config.services.len(), 1);
        assert_eq!(doc.config.services[0].name, "Beard trim");
        assert_eq!(doc.config.locations.len(), 1);
        assert_eq!(doc.config.locations[0].name, "Main St");
    }

    #[test]
    fn test_merge_rejects_invalid_result_without_writing() {
        let conn = db::init_db(":memory:").unwrap();
        merge(&conn, "org1", "agent1", &json!({"metadata": {"business_name": "Bob's"}})).unwrap();

        let err = merge(
            &conn,
            "org1",
            "agent1",
            &json!({"locations": [{"name": "Main St", "timezone": "Nowhere/City"}]}),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let doc = load(&conn, "org1", "agent1").unwrap().unwrap();
        assert_eq!(doc.version, 1);
        assert!(doc.config.locations.is_empty());
    }

    #[test]
    fn test_merge_rejects_assistant_linked_elsewhere() {
        let conn = db::init_db(":memory:").unwrap();
        let voice = json!({"integrations": {"voice": {"assistant_id": "asst_1"}}});
        merge(&conn, "org1", "agent1", &voice).unwrap();

        // re-saving the owner is fine
        merge(&conn, "org1", "agent1", &voice).unwrap();

        let err = merge(&conn, "org2", "agent1", &voice).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(load(&conn, "org2", "agent1").unwrap().is_none());
    }

    #[test]
    fn test_merge_rejects_non_object() {
        let conn = db::init_db(":memory:").unwrap();
        assert!(matches!(
            merge(&conn, "org1", "agent1", &json!([1, 2])),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_require_missing_is_not_found() {
        let conn = db::init_db(":memory:").unwrap();
        assert!(matches!(
            require(&conn, "org1", "agent1"),
            Err(AppError::NotFound(_))
        ));
    }
}
