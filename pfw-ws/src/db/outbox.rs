//! Notification outbox queries
//!
//! Rows are enqueued inside the finalize transaction and drained by the
//! outbox worker. Delivery state never feeds back into workflow data.

use pfw_common::db::OutboxMessage;
use pfw_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{parse_opt_datetime, parse_uuid};

fn message_from_row(row: &SqliteRow) -> Result<OutboxMessage> {
    let guid: String = row.get("guid");
    let recipient: String = row.get("recipient_user_id");
    let payload: String = row.get("payload");
    let created_at: String = row.get("created_at");

    Ok(OutboxMessage {
        guid: parse_uuid(&guid, "notification_outbox.guid")?,
        recipient_user_id: parse_uuid(&recipient, "notification_outbox.recipient_user_id")?,
        template_key: row.get("template_key"),
        payload: serde_json::from_str(&payload)
            .map_err(|e| Error::Internal(format!("Failed to deserialize payload: {}", e)))?,
        attempts: row.get::<i64, _>("attempts") as u32,
        last_error: row.get("last_error"),
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
            .with_timezone(&chrono::Utc),
        sent_at: parse_opt_datetime(row.get("sent_at"), "notification_outbox.sent_at")?,
    })
}

/// Enqueue a message. Callable inside a transaction so the message commits
/// or rolls back together with the correction it describes.
pub async fn enqueue<'e, E>(
    executor: E,
    recipient_user_id: Uuid,
    template_key: &str,
    payload: &serde_json::Value,
) -> Result<Uuid>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let guid = Uuid::new_v4();
    let payload_json = serde_json::to_string(payload)
        .map_err(|e| Error::Internal(format!("Failed to serialize payload: {}", e)))?;

    sqlx::query(
        "INSERT INTO notification_outbox (guid, recipient_user_id, template_key, payload, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(guid.to_string())
    .bind(recipient_user_id.to_string())
    .bind(template_key)
    .bind(&payload_json)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(executor)
    .await?;

    Ok(guid)
}

/// List unsent messages that still have delivery attempts left
pub async fn list_pending(
    pool: &SqlitePool,
    max_attempts: u32,
    limit: u32,
) -> Result<Vec<OutboxMessage>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, recipient_user_id, template_key, payload, attempts, last_error, created_at, sent_at
        FROM notification_outbox
        WHERE sent_at IS NULL AND attempts < ?
        ORDER BY created_at
        LIMIT ?
        "#,
    )
    .bind(max_attempts as i64)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    rows.iter().map(message_from_row).collect()
}

/// Mark a message delivered
pub async fn mark_sent(pool: &SqlitePool, guid: Uuid) -> Result<()> {
    sqlx::query("UPDATE notification_outbox SET sent_at = ?, last_error = NULL WHERE guid = ?")
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(guid.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Record a failed delivery attempt
pub async fn record_failure(pool: &SqlitePool, guid: Uuid, error: &str) -> Result<()> {
    sqlx::query(
        "UPDATE notification_outbox SET attempts = attempts + 1, last_error = ? WHERE guid = ?",
    )
    .bind(error)
    .bind(guid.to_string())
    .execute(pool)
    .await?;
    Ok(())
}
