//! Claim reservation engine
//!
//! The transactional core of finalize (legacy pool generation). One atomic
//! transaction converts a user's provisional claims into exclusive
//! ownership:
//!
//! 1. Create the user's private sub-pool under the shared parent.
//! 2. Per requested photo: compare-and-set `claimed_by` on the original
//!    row. A row already claimed concurrently is a soft conflict, recorded
//!    and skipped, never an abort.
//! 3. Duplicate each secured photo into the private sub-pool with
//!    `assigned_to` set; the original stays behind as an ownership
//!    tombstone so shared-pool scans exclude it.
//! 4. Correct losing users' progress rows and enqueue their notifications
//!    (same transaction).
//! 5. Detach the user from the shared parent scope and commit.
//!
//! Concurrent finalize calls contending for one photo serialize on the
//! database write lock; exactly one observes `claimed_by IS NULL`. An
//! unexpected storage error aborts the whole transaction, leaving no
//! partial state.

use pfw_common::db::{Album, AlbumKind, User};
use pfw_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

use super::conflict_notifier::{correct_conflicting_claims, ConflictCorrection};

/// Result of one finalize transaction
#[derive(Debug, Clone)]
pub struct FinalizeOutcome {
    /// The private sub-pool now holding the user's photos
    pub private_album_id: Uuid,
    /// Original photo id → duplicated private-pool photo id
    pub id_mapping: HashMap<Uuid, Uuid>,
    /// Original photo ids secured for the caller, in request order
    pub moved: Vec<Uuid>,
    /// Requested ids another user had already claimed
    pub conflicts: Vec<Uuid>,
    /// Corrections applied to losing users' progress rows
    pub corrections: Vec<ConflictCorrection>,
}

/// Reserve the requested photos exclusively for `user`.
///
/// The parent album must be a shared pool. Always succeeds for whichever
/// ids it could secure; contested ids come back in `conflicts`.
pub async fn finalize_claims(
    pool: &SqlitePool,
    user: &User,
    parent_album: &Album,
    requested: &[Uuid],
) -> Result<FinalizeOutcome> {
    if parent_album.kind != AlbumKind::Shared {
        return Err(Error::InvalidInput(format!(
            "Cannot finalize against private album {}",
            parent_album.guid
        )));
    }

    tracing::info!(
        user_id = %user.guid,
        album_id = %parent_album.guid,
        requested = requested.len(),
        "Starting finalize transaction"
    );

    let mut tx = pool.begin().await?;

    // Private sub-pool scoped to (user, parent pool)
    let private_album_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO albums (guid, session_id, name, kind, owner_user_id, parent_album_id, max_retouch)
        VALUES (?, ?, ?, 'private', ?, ?, ?)
        "#,
    )
    .bind(private_album_id.to_string())
    .bind(parent_album.session_id.to_string())
    .bind(format!("{} - {}", parent_album.name, user.display_name))
    .bind(user.guid.to_string())
    .bind(parent_album.guid.to_string())
    .bind(parent_album.max_retouch.map(|v| v as i64))
    .execute(&mut *tx)
    .await?;

    let mut moved = Vec::new();
    let mut conflicts = Vec::new();
    let mut id_mapping = HashMap::new();

    for &photo_id in requested {
        // Atomic compare-and-set-owner: zero rows means the photo was
        // claimed concurrently (or never existed in this pool).
        let claimed = sqlx::query(
            r#"
            UPDATE photos
            SET claimed_by = ?, updated_at = CURRENT_TIMESTAMP
            WHERE guid = ? AND album_id = ? AND claimed_by IS NULL
            "#,
        )
        .bind(user.guid.to_string())
        .bind(photo_id.to_string())
        .bind(parent_album.guid.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            tracing::debug!(
                user_id = %user.guid,
                photo_id = %photo_id,
                "Requested photo already claimed, recording soft conflict"
            );
            conflicts.push(photo_id);
            continue;
        }

        let media_ref: String = sqlx::query("SELECT media_ref FROM photos WHERE guid = ?")
            .bind(photo_id.to_string())
            .fetch_one(&mut *tx)
            .await?
            .get("media_ref");

        // Duplicate into the private sub-pool; the original stays in the
        // parent as a tombstone.
        let duplicate_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO photos (guid, album_id, media_ref, assigned_to, source_photo_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(duplicate_id.to_string())
        .bind(private_album_id.to_string())
        .bind(&media_ref)
        .bind(user.guid.to_string())
        .bind(photo_id.to_string())
        .execute(&mut *tx)
        .await?;

        id_mapping.insert(photo_id, duplicate_id);
        moved.push(photo_id);
    }

    // Losing users' claimed/retouch sets are pruned and their
    // notifications enqueued before anything becomes visible.
    let corrections =
        correct_conflicting_claims(&mut tx, user, parent_album.guid, &moved).await?;

    // The acquiring user leaves the shared parent scope
    sqlx::query("DELETE FROM album_members WHERE user_id = ? AND album_id = ?")
        .bind(user.guid.to_string())
        .bind(parent_album.guid.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        user_id = %user.guid,
        album_id = %parent_album.guid,
        private_album_id = %private_album_id,
        moved = moved.len(),
        conflicts = conflicts.len(),
        corrected_users = corrections.len(),
        "Finalize transaction committed"
    );

    Ok(FinalizeOutcome {
        private_album_id,
        id_mapping,
        moved,
        conflicts,
        corrections,
    })
}
