//! Album (legacy pool) queries

use pfw_common::db::{Album, AlbumKind, DEFAULT_MAX_RETOUCH};
use pfw_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{parse_opt_uuid, parse_uuid};

pub(crate) fn album_from_row(row: &SqliteRow) -> Result<Album> {
    let guid: String = row.get("guid");
    let session_id: String = row.get("session_id");
    let kind: String = row.get("kind");
    Ok(Album {
        guid: parse_uuid(&guid, "albums.guid")?,
        session_id: parse_uuid(&session_id, "albums.session_id")?,
        name: row.get("name"),
        kind: AlbumKind::parse(&kind)
            .ok_or_else(|| Error::Internal(format!("Unknown album kind: {}", kind)))?,
        owner_user_id: parse_opt_uuid(row.get("owner_user_id"), "albums.owner_user_id")?,
        parent_album_id: parse_opt_uuid(row.get("parent_album_id"), "albums.parent_album_id")?,
        max_retouch: row.get::<Option<i64>, _>("max_retouch").map(|v| v as u32),
    })
}

/// Load an album by id
pub async fn get_album(pool: &SqlitePool, album_id: Uuid) -> Result<Option<Album>> {
    let row = sqlx::query(
        "SELECT guid, session_id, name, kind, owner_user_id, parent_album_id, max_retouch
         FROM albums WHERE guid = ?",
    )
    .bind(album_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(album_from_row).transpose()
}

/// Find the user's private sub-pool under a shared parent album, if one was
/// created at finalize.
pub async fn find_private_album(
    pool: &SqlitePool,
    user_id: Uuid,
    parent_album_id: Uuid,
) -> Result<Option<Album>> {
    let row = sqlx::query(
        "SELECT guid, session_id, name, kind, owner_user_id, parent_album_id, max_retouch
         FROM albums
         WHERE parent_album_id = ? AND owner_user_id = ? AND kind = 'private'",
    )
    .bind(parent_album_id.to_string())
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(album_from_row).transpose()
}

/// Resolve the retouch selection limit for a legacy album.
///
/// Override chain: session override (project) → partner default (group) →
/// album value (pool) → hard default. A private sub-pool resolves through
/// its shared parent's chain.
pub async fn resolve_max_retouch(pool: &SqlitePool, album: &Album) -> Result<u32> {
    let scope_album_id = album.parent_album_id.unwrap_or(album.guid);

    let row = sqlx::query(
        r#"
        SELECT s.max_retouch_override, p.default_max_retouch, a.max_retouch
        FROM albums a
        JOIN sessions s ON s.guid = a.session_id
        JOIN partners p ON p.guid = s.partner_id
        WHERE a.guid = ?
        "#,
    )
    .bind(scope_album_id.to_string())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Album not found: {}", scope_album_id)))?;

    let session_override: Option<i64> = row.get("max_retouch_override");
    let partner_default: Option<i64> = row.get("default_max_retouch");
    let album_default: Option<i64> = row.get("max_retouch");

    Ok(session_override
        .or(partner_default)
        .or(album_default)
        .map(|v| v as u32)
        .unwrap_or(DEFAULT_MAX_RETOUCH))
}

/// Whether the user is attached to the shared album
pub async fn is_album_member(pool: &SqlitePool, user_id: Uuid, album_id: Uuid) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM album_members WHERE user_id = ? AND album_id = ?)",
    )
    .bind(user_id.to_string())
    .bind(album_id.to_string())
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Attach a user to a shared album
pub async fn attach_member(pool: &SqlitePool, user_id: Uuid, album_id: Uuid) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO album_members (user_id, album_id) VALUES (?, ?)")
        .bind(user_id.to_string())
        .bind(album_id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}
