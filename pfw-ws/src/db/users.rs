//! User lookups

use pfw_common::db::User;
use pfw_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_uuid;

/// Load a user by id
pub async fn get_user(pool: &SqlitePool, user_id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query("SELECT guid, display_name, email FROM users WHERE guid = ?")
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let guid: String = row.get("guid");
            Ok(Some(User {
                guid: parse_uuid(&guid, "users.guid")?,
                display_name: row.get("display_name"),
                email: row.get("email"),
            }))
        }
        None => Ok(None),
    }
}

/// Insert a user row
pub async fn insert_user(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query("INSERT INTO users (guid, display_name, email) VALUES (?, ?, ?)")
        .bind(user.guid.to_string())
        .bind(&user.display_name)
        .bind(&user.email)
        .execute(pool)
        .await?;
    Ok(())
}
