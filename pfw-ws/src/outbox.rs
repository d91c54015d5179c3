//! Notification outbox worker
//!
//! Drains `notification_outbox` on an interval and hands each message to
//! the email sender. Failures are logged and retried on later passes;
//! delivery state never touches workflow data, so a dead relay cannot
//! undo or delay a conflict correction.

use pfw_common::db::setting_i64;
use pfw_common::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::db::{outbox, users};
use crate::services::EmailSender;

/// Spawn the worker loop. Runs until the process exits.
pub fn spawn(db: SqlitePool, sender: Arc<dyn EmailSender>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let poll_ms = setting_i64(&db, "ws_outbox_poll_interval_ms", 2000)
                .await
                .unwrap_or(2000);

            if let Err(e) = drain_once(&db, sender.as_ref()).await {
                tracing::error!(error = %e, "Outbox pass failed");
            }

            tokio::time::sleep(Duration::from_millis(poll_ms as u64)).await;
        }
    })
}

/// Attempt delivery of every pending message once. Returns the number of
/// messages delivered this pass.
pub async fn drain_once(db: &SqlitePool, sender: &dyn EmailSender) -> Result<usize> {
    let max_attempts = setting_i64(db, "ws_outbox_max_attempts", 5).await? as u32;
    let pending = outbox::list_pending(db, max_attempts, 50).await?;

    let mut delivered = 0;

    for message in pending {
        let recipient = match users::get_user(db, message.recipient_user_id).await? {
            Some(user) => user,
            None => {
                // Recipient deleted since enqueue; nothing to deliver.
                tracing::warn!(
                    message_id = %message.guid,
                    recipient = %message.recipient_user_id,
                    "Dropping outbox message for missing user"
                );
                outbox::mark_sent(db, message.guid).await?;
                continue;
            }
        };

        match sender
            .send(&message.template_key, &recipient.email, &message.payload)
            .await
        {
            Ok(()) => {
                outbox::mark_sent(db, message.guid).await?;
                delivered += 1;
                tracing::info!(
                    message_id = %message.guid,
                    template = %message.template_key,
                    recipient = %recipient.email,
                    "Notification delivered"
                );
            }
            Err(e) => {
                // Best-effort by contract: log, count the attempt, move on.
                tracing::warn!(
                    message_id = %message.guid,
                    template = %message.template_key,
                    attempt = message.attempts + 1,
                    error = %e,
                    "Notification delivery failed, will retry"
                );
                outbox::record_failure(db, message.guid, &e.to_string()).await?;
            }
        }
    }

    Ok(delivered)
}
