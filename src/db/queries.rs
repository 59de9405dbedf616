use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{CallLog, Organization, PlanUpdate, FREE_PLAN};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn now_str() -> String {
    Utc::now().naive_utc().format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).unwrap_or_else(|_| Utc::now().naive_utc())
}

// ── Agent configs ──

#[derive(Debug, Clone)]
pub struct StoredConfig {
    pub data: serde_json::Value,
    pub version: i64,
    pub updated_at: NaiveDateTime,
}

pub fn get_config(
    conn: &Connection,
    org_id: &str,
    agent_id: &str,
) -> anyhow::Result<Option<StoredConfig>> {
    let row = conn
        .query_row(
            "SELECT data, version, updated_at FROM agent_configs WHERE org_id = ?1 AND agent_id = ?2",
            params![org_id, agent_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((data, version, updated_at)) => Ok(Some(StoredConfig {
            data: serde_json::from_str(&data)?,
            version,
            updated_at: parse_ts(&updated_at),
        })),
        None => Ok(None),
    }
}

/// Insert or replace the stored document, bumping its version. Returns the new version.
pub fn put_config(
    conn: &Connection,
    org_id: &str,
    agent_id: &str,
    data: &serde_json::Value,
) -> anyhow::Result<i64> {
    let now = now_str();
    let json = serde_json::to_string(data)?;
    let version: i64 = conn.query_row(
        "INSERT INTO agent_configs (org_id, agent_id, data, version, created_at, updated_at)
         VALUES (?1, ?2, ?3, 1, ?4, ?4)
         ON CONFLICT(org_id, agent_id) DO UPDATE SET
           data = excluded.data,
           version = agent_configs.version + 1,
           updated_at = excluded.updated_at
         RETURNING version",
        params![org_id, agent_id, json, now],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// The (org_id, agent_id) whose config carries this voice assistant id.
pub fn find_agent_by_assistant(
    conn: &Connection,
    assistant_id: &str,
) -> anyhow::Result<Option<(String, String)>> {
    let found = conn
        .query_row(
            "SELECT org_id, agent_id FROM agent_configs
             WHERE json_extract(data, '$.integrations.voice.assistant_id') = ?1
             ORDER BY org_id, agent_id
             LIMIT 1",
            params![assistant_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(found)
}

/// Another (org_id, agent_id) already linked to this assistant, if any.
pub fn find_other_agent_by_assistant(
    conn: &Connection,
    assistant_id: &str,
    org_id: &str,
    agent_id: &str,
) -> anyhow::Result<Option<(String, String)>> {
    let found = conn
        .query_row(
            "SELECT org_id, agent_id FROM agent_configs
             WHERE json_extract(data, '$.integrations.voice.assistant_id') = ?1
               AND NOT (org_id = ?2 AND agent_id = ?3)
             ORDER BY org_id, agent_id
             LIMIT 1",
            params![assistant_id, org_id, agent_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(found)
}

// ── Organizations ──

pub fn get_organization(conn: &Connection, org_id: &str) -> anyhow::Result<Option<Organization>> {
    let org = conn
        .query_row(
            "SELECT id, plan, stripe_customer_id, stripe_subscription_id, subscription_status, updated_at
             FROM organizations WHERE id = ?1",
            params![org_id],
            |row| {
                let updated_at: String = row.get(5)?;
                Ok(Organization {
                    id: row.get(0)?,
                    plan: row.get(1)?,
                    stripe_customer_id: row.get(2)?,
                    stripe_subscription_id: row.get(3)?,
                    subscription_status: row.get(4)?,
                    updated_at: parse_ts(&updated_at),
                })
            },
        )
        .optional()?;
    Ok(org)
}

/// Merge billing fields into the organization row, creating it on first write.
pub fn update_plan(conn: &Connection, org_id: &str, update: &PlanUpdate) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO organizations (id, plan, stripe_customer_id, stripe_subscription_id, subscription_status, updated_at)
         VALUES (?1, COALESCE(?2, ?6), ?3, ?4, ?5, ?7)
         ON CONFLICT(id) DO UPDATE SET
           plan = COALESCE(?2, organizations.plan),
           stripe_customer_id = COALESCE(?3, organizations.stripe_customer_id),
           stripe_subscription_id = COALESCE(?4, organizations.stripe_subscription_id),
           subscription_status = COALESCE(?5, organizations.subscription_status),
           updated_at = ?7",
        params![
            org_id,
            update.plan,
            update.stripe_customer_id,
            update.stripe_subscription_id,
            update.subscription_status,
            FREE_PLAN,
            now_str(),
        ],
    )?;
    Ok(())
}

pub fn find_org_by_customer(conn: &Connection, customer_id: &str) -> anyhow::Result<Option<String>> {
    let id = conn
        .query_row(
            "SELECT id FROM organizations WHERE stripe_customer_id = ?1",
            params![customer_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

// ── Call logs ──

pub fn insert_call_log(conn: &Connection, log: &CallLog) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO call_logs (id, org_id, agent_id, call_id, customer_number, summary, transcript, ended_reason, duration_seconds, email_sent, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            log.id,
            log.org_id,
            log.agent_id,
            log.call_id,
            log.customer_number,
            log.summary,
            log.transcript,
            log.ended_reason,
            log.duration_seconds,
            log.email_sent as i32,
            log.created_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn mark_call_log_emailed(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE call_logs SET email_sent = 1 WHERE id = ?1",
        params![id],
    )?;
    Ok(count > 0)
}

pub fn list_call_logs(
    conn: &Connection,
    org_id: &str,
    agent_id: &str,
    limit: i64,
) -> anyhow::Result<Vec<CallLog>> {
    let mut stmt = conn.prepare(
        "SELECT id, org_id, agent_id, call_id, customer_number, summary, transcript, ended_reason, duration_seconds, email_sent, created_at
         FROM call_logs WHERE org_id = ?1 AND agent_id = ?2
         ORDER BY created_at DESC LIMIT ?3",
    )?;

    let rows = stmt.query_map(params![org_id, agent_id, limit], |row| {
        let created_at: String = row.get(10)?;
        Ok(CallLog {
            id: row.get(0)?,
            org_id: row.get(1)?,
            agent_id: row.get(2)?,
            call_id: row.get(3)?,
            customer_number: row.get(4)?,
            summary: row.get(5)?,
            transcript: row.get(6)?,
            ended_reason: row.get(7)?,
            duration_seconds: row.get(8)?,
            email_sent: row.get::<_, i32>(9)? != 0,
            created_at: parse_ts(&created_at),
        })
    })?;

    let mut logs = vec![];
    for row in rows {
        logs.push(row?);
    }
    Ok(logs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use serde_json::json;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    #[test]
    fn test_get_missing_config() {
        let conn = setup_db();
        assert!(get_config(&conn, "org1", "agent1").unwrap().is_none());
    }

    #[test]
    fn test_put_config_bumps_version() {
        let conn = setup_db();
        assert_eq!(put_config(&conn, "org1", "agent1", &json!({"a": 1})).unwrap(), 1);
        assert_eq!(put_config(&conn, "org1", "agent1", &json!({"a": 2})).unwrap(), 2);

        let stored = get_config(&conn, "org1", "agent1").unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.data, json!({"a": 2}));
    }

    #[test]
    fn test_configs_are_scoped_by_org_and_agent() {
        let conn = setup_db();
        put_config(&conn, "org1", "agent1", &json!({"a": 1})).unwrap();
        assert!(get_config(&conn, "org1", "agent2").unwrap().is_none());
        assert!(get_config(&conn, "org2", "agent1").unwrap().is_none());
    }

    #[test]
    fn test_find_agent_by_assistant() {
        let conn = setup_db();
        put_config(
            &conn,
            "org1",
            "agent1",
            &json!({"integrations": {"voice": {"assistant_id": "asst_123"}}}),
        )
        .unwrap();

        assert_eq!(
            find_agent_by_assistant(&conn, "asst_123").unwrap(),
            Some(("org1".to_string(), "agent1".to_string()))
        );
        assert!(find_agent_by_assistant(&conn, "asst_999").unwrap().is_none());
    }

    #[test]
    fn test_find_other_agent_by_assistant_skips_self() {
        let conn = setup_db();
        let data = json!({"integrations": {"voice": {"assistant_id": "asst_123"}}});
        put_config(&conn, "org1", "agent1", &data).unwrap();

        assert!(find_other_agent_by_assistant(&conn, "asst_123", "org1", "agent1")
            .unwrap()
            .is_none());
        assert_eq!(
            find_other_agent_by_assistant(&conn, "asst_123", "org2", "agent1").unwrap(),
            Some(("org1".to_string(), "agent1".to_string()))
        );
    }

    #[test]
    fn test_update_plan_creates_then_merges() {
        let conn = setup_db();
        update_plan(
            &conn,
            "org1",
            &PlanUpdate {
                stripe_customer_id: Some("cus_1".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let org = get_organization(&conn, "org1").unwrap().unwrap();
        assert_eq!(org.plan, FREE_PLAN);
        assert_eq!(org.stripe_customer_id.as_deref(), Some("cus_1"));

        update_plan(
            &conn,
            "org1",
            &PlanUpdate {
                plan: Some("pro".to_string()),
                subscription_status: Some("active".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let org = get_organization(&conn, "org1").unwrap().unwrap();
        assert_eq!(org.plan, "pro");
        assert_eq!(org.stripe_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(org.subscription_status.as_deref(), Some("active"));
        assert_eq!(find_org_by_customer(&conn, "cus_1").unwrap().as_deref(), Some("org1"));
    }

    #[test]
    fn test_call_logs_round_trip() {
        let conn = setup_db();
        let log = CallLog {
            id: "log-1".to_string(),
            org_id: "org1".to_string(),
            agent_id: "agent1".to_string(),
            call_id: Some("call_1".to_string()),
            customer_number: Some("+15551110000".to_string()),
            summary: "Booked a haircut".to_string(),
            transcript: "...".to_string(),
            ended_reason: Some("customer-ended-call".to_string()),
            duration_seconds: Some(93.5),
            email_sent: false,
            created_at: Utc::now().naive_utc(),
        };
        insert_call_log(&conn, &log).unwrap();
        assert!(mark_call_log_emailed(&conn, "log-1").unwrap());
        assert!(!mark_call_log_emailed(&conn, "missing").unwrap());

        let logs = list_call_logs(&conn, "org1", "agent1", 10).unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].email_sent);
        assert_eq!(logs[0].summary, "Booked a haircut");
    }
}
