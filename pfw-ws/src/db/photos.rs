//! Photo queries

use pfw_common::db::Photo;
use pfw_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{parse_opt_uuid, parse_uuid};

pub(crate) fn photo_from_row(row: &SqliteRow) -> Result<Photo> {
    let guid: String = row.get("guid");
    Ok(Photo {
        guid: parse_uuid(&guid, "photos.guid")?,
        album_id: parse_opt_uuid(row.get("album_id"), "photos.album_id")?,
        gallery_id: parse_opt_uuid(row.get("gallery_id"), "photos.gallery_id")?,
        media_ref: row.get("media_ref"),
        claimed_by: parse_opt_uuid(row.get("claimed_by"), "photos.claimed_by")?,
        assigned_to: parse_opt_uuid(row.get("assigned_to"), "photos.assigned_to")?,
        source_photo_id: parse_opt_uuid(row.get("source_photo_id"), "photos.source_photo_id")?,
    })
}

const PHOTO_COLUMNS: &str =
    "guid, album_id, gallery_id, media_ref, claimed_by, assigned_to, source_photo_id";

/// List the photos of an album still available to claimants. Claimed
/// originals stay in the shared pool as tombstones and are excluded here.
pub async fn list_available_album_photos(pool: &SqlitePool, album_id: Uuid) -> Result<Vec<Photo>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM photos WHERE album_id = ? AND claimed_by IS NULL ORDER BY created_at, guid",
        PHOTO_COLUMNS
    ))
    .bind(album_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(photo_from_row).collect()
}

/// List every photo of an album, tombstones included
pub async fn list_album_photos(pool: &SqlitePool, album_id: Uuid) -> Result<Vec<Photo>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM photos WHERE album_id = ? ORDER BY created_at, guid",
        PHOTO_COLUMNS
    ))
    .bind(album_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(photo_from_row).collect()
}

/// List the photos of a gallery
pub async fn list_gallery_photos(pool: &SqlitePool, gallery_id: Uuid) -> Result<Vec<Photo>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM photos WHERE gallery_id = ? ORDER BY created_at, guid",
        PHOTO_COLUMNS
    ))
    .bind(gallery_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(photo_from_row).collect()
}

/// Load a single photo
pub async fn get_photo(pool: &SqlitePool, photo_id: Uuid) -> Result<Option<Photo>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM photos WHERE guid = ?",
        PHOTO_COLUMNS
    ))
    .bind(photo_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(photo_from_row).transpose()
}

/// Insert a photo row
pub async fn insert_photo(pool: &SqlitePool, photo: &Photo) -> Result<()> {
    sqlx::query(
        "INSERT INTO photos (guid, album_id, gallery_id, media_ref, claimed_by, assigned_to, source_photo_id)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(photo.guid.to_string())
    .bind(photo.album_id.map(|id| id.to_string()))
    .bind(photo.gallery_id.map(|id| id.to_string()))
    .bind(&photo.media_ref)
    .bind(photo.claimed_by.map(|id| id.to_string()))
    .bind(photo.assigned_to.map(|id| id.to_string()))
    .bind(photo.source_photo_id.map(|id| id.to_string()))
    .execute(pool)
    .await?;
    Ok(())
}
