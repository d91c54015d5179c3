//! Progress store
//!
//! One row per (user, pool). Patches merge field-wise into the stored
//! selection record; fields absent from a patch survive unchanged.

use pfw_common::db::{ProgressRow, SelectionState, WorkflowStep};
use pfw_common::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{parse_opt_datetime, parse_opt_uuid, parse_uuid};

/// Partial update of a progress row. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<WorkflowStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_ids: Option<Vec<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retouch_ids: Option<Vec<Uuid>>,
    /// Outer None = untouched; Some(None) clears the final selection.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub final_id: Option<Option<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_album_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<chrono::DateTime<chrono::Utc>>,
}

fn double_option<'de, T, D>(de: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

pub(crate) fn progress_from_row(row: &SqliteRow) -> Result<ProgressRow> {
    let guid: String = row.get("guid");
    let user_id: String = row.get("user_id");
    let step: String = row.get("current_step");
    let claimed_json: String = row.get("claimed_ids");
    let retouch_json: String = row.get("retouch_ids");

    let claimed: Vec<Uuid> = serde_json::from_str(&claimed_json)
        .map_err(|e| Error::Internal(format!("Failed to deserialize claimed_ids: {}", e)))?;
    let retouch: Vec<Uuid> = serde_json::from_str(&retouch_json)
        .map_err(|e| Error::Internal(format!("Failed to deserialize retouch_ids: {}", e)))?;

    Ok(ProgressRow {
        guid: parse_uuid(&guid, "progress.guid")?,
        user_id: parse_uuid(&user_id, "progress.user_id")?,
        album_id: parse_opt_uuid(row.get("album_id"), "progress.album_id")?,
        gallery_id: parse_opt_uuid(row.get("gallery_id"), "progress.gallery_id")?,
        private_album_id: parse_opt_uuid(row.get("private_album_id"), "progress.private_album_id")?,
        current_step: WorkflowStep::parse(&step)
            .ok_or_else(|| Error::Internal(format!("Unknown workflow step: {}", step)))?,
        selection: SelectionState {
            claimed,
            retouch,
            final_id: parse_opt_uuid(row.get("final_id"), "progress.final_id")?,
        },
        claimed_count: row.get::<i64, _>("claimed_count") as u32,
        retouch_count: row.get::<i64, _>("retouch_count") as u32,
        finalized_at: parse_opt_datetime(row.get("finalized_at"), "progress.finalized_at")?,
        modification_count: row.get::<i64, _>("modification_count") as u32,
    })
}

const PROGRESS_COLUMNS: &str = "guid, user_id, album_id, gallery_id, private_album_id, \
     current_step, claimed_ids, retouch_ids, final_id, claimed_count, retouch_count, \
     finalized_at, modification_count";

/// Look up a user's progress on a legacy album.
///
/// Matches the row keyed on the album itself, and also a row keyed on the
/// user's generated private sub-pool of that parent (post-finalize data).
pub async fn get_for_album(
    pool: &SqlitePool,
    user_id: Uuid,
    album_id: Uuid,
) -> Result<Option<ProgressRow>> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {} FROM progress
        WHERE user_id = ?1
          AND (album_id = ?2
               OR album_id IN (SELECT guid FROM albums
                               WHERE parent_album_id = ?2 AND owner_user_id = ?1))
        "#,
        PROGRESS_COLUMNS
    ))
    .bind(user_id.to_string())
    .bind(album_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(progress_from_row).transpose()
}

/// Look up a user's progress on a gallery
pub async fn get_for_gallery(
    pool: &SqlitePool,
    user_id: Uuid,
    gallery_id: Uuid,
) -> Result<Option<ProgressRow>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM progress WHERE user_id = ? AND gallery_id = ?",
        PROGRESS_COLUMNS
    ))
    .bind(user_id.to_string())
    .bind(gallery_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(progress_from_row).transpose()
}

/// Merge a patch into the user's progress on an album, creating the row on
/// first touch. Counts are recomputed from patched sets; the modification
/// counter is bumped on every write.
pub async fn upsert_for_album(
    pool: &SqlitePool,
    user_id: Uuid,
    album_id: Uuid,
    patch: &ProgressPatch,
) -> Result<ProgressRow> {
    let existing = get_for_album(pool, user_id, album_id).await?;
    upsert(pool, user_id, Some(album_id), None, existing, patch).await
}

/// Merge a patch into the user's progress on a gallery
pub async fn upsert_for_gallery(
    pool: &SqlitePool,
    user_id: Uuid,
    gallery_id: Uuid,
    patch: &ProgressPatch,
) -> Result<ProgressRow> {
    let existing = get_for_gallery(pool, user_id, gallery_id).await?;
    upsert(pool, user_id, None, Some(gallery_id), existing, patch).await
}

async fn upsert(
    pool: &SqlitePool,
    user_id: Uuid,
    album_id: Option<Uuid>,
    gallery_id: Option<Uuid>,
    existing: Option<ProgressRow>,
    patch: &ProgressPatch,
) -> Result<ProgressRow> {
    let mut progress = existing.unwrap_or_else(|| ProgressRow {
        guid: Uuid::new_v4(),
        user_id,
        album_id,
        gallery_id,
        private_album_id: None,
        current_step: WorkflowStep::Claiming,
        selection: SelectionState::default(),
        claimed_count: 0,
        retouch_count: 0,
        finalized_at: None,
        modification_count: 0,
    });

    apply_patch(&mut progress, patch);
    progress.modification_count += 1;

    save(pool, &progress).await?;
    Ok(progress)
}

/// Merge patch fields into the row. Selection stays the flat record;
/// unmentioned fields survive unchanged.
pub(crate) fn apply_patch(progress: &mut ProgressRow, patch: &ProgressPatch) {
    if let Some(step) = patch.current_step {
        // Steps only move forward; the registration alias shares claiming's
        // position so it never regresses a row.
        if step.position() >= progress.current_step.position() {
            progress.current_step = step;
        }
    }
    if let Some(claimed) = &patch.claimed_ids {
        progress.selection.claimed = claimed.clone();
        progress.claimed_count = claimed.len() as u32;
    }
    if let Some(retouch) = &patch.retouch_ids {
        progress.selection.retouch = retouch.clone();
        progress.retouch_count = retouch.len() as u32;
    }
    if let Some(final_id) = patch.final_id {
        progress.selection.final_id = final_id;
    }
    if let Some(private_album_id) = patch.private_album_id {
        progress.private_album_id = Some(private_album_id);
    }
    if let Some(finalized_at) = patch.finalized_at {
        progress.finalized_at = Some(finalized_at);
    }
}

/// Persist a progress row (insert or full update by guid)
pub async fn save(pool: &SqlitePool, progress: &ProgressRow) -> Result<()> {
    let claimed = serde_json::to_string(&progress.selection.claimed)
        .map_err(|e| Error::Internal(format!("Failed to serialize claimed_ids: {}", e)))?;
    let retouch = serde_json::to_string(&progress.selection.retouch)
        .map_err(|e| Error::Internal(format!("Failed to serialize retouch_ids: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO progress (
            guid, user_id, album_id, gallery_id, private_album_id,
            current_step, claimed_ids, retouch_ids, final_id,
            claimed_count, retouch_count, finalized_at, modification_count
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(guid) DO UPDATE SET
            private_album_id = excluded.private_album_id,
            current_step = excluded.current_step,
            claimed_ids = excluded.claimed_ids,
            retouch_ids = excluded.retouch_ids,
            final_id = excluded.final_id,
            claimed_count = excluded.claimed_count,
            retouch_count = excluded.retouch_count,
            finalized_at = excluded.finalized_at,
            modification_count = excluded.modification_count,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(progress.guid.to_string())
    .bind(progress.user_id.to_string())
    .bind(progress.album_id.map(|id| id.to_string()))
    .bind(progress.gallery_id.map(|id| id.to_string()))
    .bind(progress.private_album_id.map(|id| id.to_string()))
    .bind(progress.current_step.as_str())
    .bind(&claimed)
    .bind(&retouch)
    .bind(progress.selection.final_id.map(|id| id.to_string()))
    .bind(progress.claimed_count as i64)
    .bind(progress.retouch_count as i64)
    .bind(progress.finalized_at.map(|dt| dt.to_rfc3339()))
    .bind(progress.modification_count as i64)
    .execute(pool)
    .await?;

    Ok(())
}
