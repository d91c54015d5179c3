//! Gallery (newer pool generation) queries

use pfw_common::db::{Gallery, DEFAULT_MAX_RETOUCH};
use pfw_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_uuid;

/// Load a gallery by id
pub async fn get_gallery(pool: &SqlitePool, gallery_id: Uuid) -> Result<Option<Gallery>> {
    let row = sqlx::query(
        "SELECT guid, partner_id, name, max_retouch FROM galleries WHERE guid = ?",
    )
    .bind(gallery_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let guid: String = row.get("guid");
            let partner_id: String = row.get("partner_id");
            Ok(Some(Gallery {
                guid: parse_uuid(&guid, "galleries.guid")?,
                partner_id: parse_uuid(&partner_id, "galleries.partner_id")?,
                name: row.get("name"),
                max_retouch: row.get::<Option<i64>, _>("max_retouch").map(|v| v as u32),
            }))
        }
        None => Ok(None),
    }
}

/// Resolve the retouch selection limit for a gallery.
///
/// Galleries have no project scope; the chain is partner default (group) →
/// gallery value (pool) → hard default.
pub async fn resolve_max_retouch(pool: &SqlitePool, gallery: &Gallery) -> Result<u32> {
    let row = sqlx::query(
        r#"
        SELECT p.default_max_retouch, g.max_retouch
        FROM galleries g
        JOIN partners p ON p.guid = g.partner_id
        WHERE g.guid = ?
        "#,
    )
    .bind(gallery.guid.to_string())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Gallery not found: {}", gallery.guid)))?;

    let partner_default: Option<i64> = row.get("default_max_retouch");
    let gallery_default: Option<i64> = row.get("max_retouch");

    Ok(partner_default
        .or(gallery_default)
        .map(|v| v as u32)
        .unwrap_or(DEFAULT_MAX_RETOUCH))
}
