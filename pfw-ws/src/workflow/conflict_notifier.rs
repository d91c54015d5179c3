//! Conflict resolution for losing claimants
//!
//! When a finalize call wins photos that other users had provisionally
//! claimed, their progress rows are corrected here, inside the winner's
//! transaction, and one outbox notification is enqueued per corrected user.
//! Delivery happens later in the outbox worker; a send failure can never
//! roll back the correction.

use pfw_common::db::User;
use pfw_common::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

use crate::db::outbox;
use crate::db::progress::progress_from_row;

/// Template key for the "your photos were claimed by someone else" mail
pub const RECLAIM_TEMPLATE: &str = "photos_reclaimed";

/// One corrected loser: which IDs were removed from their selections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCorrection {
    pub user_id: Uuid,
    pub removed: Vec<Uuid>,
}

/// Correct every other progress row on the parent pool whose claimed set
/// intersects the moved IDs. Returns the corrections applied.
pub async fn correct_conflicting_claims(
    tx: &mut Transaction<'_, Sqlite>,
    winner: &User,
    parent_album_id: Uuid,
    moved: &[Uuid],
) -> Result<Vec<ConflictCorrection>> {
    if moved.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query(
        r#"
        SELECT guid, user_id, album_id, gallery_id, private_album_id,
               current_step, claimed_ids, retouch_ids, final_id,
               claimed_count, retouch_count, finalized_at, modification_count
        FROM progress
        WHERE album_id = ? AND user_id != ?
        "#,
    )
    .bind(parent_album_id.to_string())
    .bind(winner.guid.to_string())
    .fetch_all(&mut **tx)
    .await?;

    let mut corrections = Vec::new();

    for row in &rows {
        let mut progress = progress_from_row(row)?;
        let removed = progress.selection.remove_ids(moved);
        if removed.is_empty() {
            continue;
        }

        progress.claimed_count = progress.selection.claimed.len() as u32;
        progress.retouch_count = progress.selection.retouch.len() as u32;
        progress.modification_count += 1;

        let claimed = serde_json::to_string(&progress.selection.claimed)
            .map_err(|e| pfw_common::Error::Internal(format!("Failed to serialize claimed_ids: {}", e)))?;
        let retouch = serde_json::to_string(&progress.selection.retouch)
            .map_err(|e| pfw_common::Error::Internal(format!("Failed to serialize retouch_ids: {}", e)))?;

        sqlx::query(
            r#"
            UPDATE progress
            SET claimed_ids = ?, retouch_ids = ?, final_id = ?,
                claimed_count = ?, retouch_count = ?,
                modification_count = ?, updated_at = CURRENT_TIMESTAMP
            WHERE guid = ?
            "#,
        )
        .bind(&claimed)
        .bind(&retouch)
        .bind(progress.selection.final_id.map(|id| id.to_string()))
        .bind(progress.claimed_count as i64)
        .bind(progress.retouch_count as i64)
        .bind(progress.modification_count as i64)
        .bind(progress.guid.to_string())
        .execute(&mut **tx)
        .await?;

        let payload = json!({
            "album_id": parent_album_id,
            "removed_photo_ids": removed,
            "winner_name": winner.display_name,
        });
        outbox::enqueue(&mut **tx, progress.user_id, RECLAIM_TEMPLATE, &payload).await?;

        tracing::info!(
            user_id = %progress.user_id,
            album_id = %parent_album_id,
            removed = removed.len(),
            winner = %winner.display_name,
            "Corrected conflicting claims for losing user"
        );

        corrections.push(ConflictCorrection {
            user_id: progress.user_id,
            removed,
        });
    }

    Ok(corrections)
}
