//! Database initialization
//!
//! Creates the database on first run with the full schema, then applies
//! idempotent per-table creation and default settings on every start.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    configure_and_migrate(&pool).await?;

    Ok(pool)
}

/// Initialize an in-memory database with the full schema. Test use only.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    configure_and_migrate(&pool).await?;
    Ok(pool)
}

async fn configure_and_migrate(pool: &SqlitePool) -> Result<()> {
    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL allows concurrent readers while one finalize transaction writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    // Short busy timeout; contended writes go through the retry helper
    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    create_users_table(pool).await?;
    create_settings_table(pool).await?;
    create_partners_table(pool).await?;
    create_sessions_table(pool).await?;
    create_albums_table(pool).await?;
    create_galleries_table(pool).await?;
    create_photos_table(pool).await?;
    create_album_members_table(pool).await?;
    create_progress_table(pool).await?;
    create_notification_outbox_table(pool).await?;

    init_default_settings(pool).await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            email TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores service configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_partners_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS partners (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            default_max_retouch INTEGER,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (default_max_retouch IS NULL OR default_max_retouch > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            guid TEXT PRIMARY KEY,
            partner_id TEXT NOT NULL REFERENCES partners(guid) ON DELETE CASCADE,
            name TEXT NOT NULL,
            max_retouch_override INTEGER,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (max_retouch_override IS NULL OR max_retouch_override > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_partner ON sessions(partner_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the albums table (legacy pool generation)
///
/// Shared albums hold the candidate pool; private albums are per-user
/// sub-pools created at finalize, linked to their shared parent.
pub async fn create_albums_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS albums (
            guid TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES sessions(guid) ON DELETE CASCADE,
            name TEXT NOT NULL,
            kind TEXT NOT NULL DEFAULT 'shared' CHECK (kind IN ('shared', 'private')),
            owner_user_id TEXT REFERENCES users(guid) ON DELETE CASCADE,
            parent_album_id TEXT REFERENCES albums(guid) ON DELETE CASCADE,
            max_retouch INTEGER,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (max_retouch IS NULL OR max_retouch > 0),
            CHECK (kind != 'private' OR owner_user_id IS NOT NULL)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_albums_session ON albums(session_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_albums_parent ON albums(parent_album_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_galleries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS galleries (
            guid TEXT PRIMARY KEY,
            partner_id TEXT NOT NULL REFERENCES partners(guid) ON DELETE CASCADE,
            name TEXT NOT NULL,
            max_retouch INTEGER,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (max_retouch IS NULL OR max_retouch > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_galleries_partner ON galleries(partner_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the photos table
///
/// A photo belongs to exactly one pool. `claimed_by` is set exactly once, at
/// finalize; the original row then stays in the shared pool as an ownership
/// tombstone. Rows duplicated into a private sub-pool carry `assigned_to`
/// and a pointer back to their source row.
pub async fn create_photos_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS photos (
            guid TEXT PRIMARY KEY,
            album_id TEXT REFERENCES albums(guid) ON DELETE CASCADE,
            gallery_id TEXT REFERENCES galleries(guid) ON DELETE CASCADE,
            media_ref TEXT NOT NULL,
            claimed_by TEXT REFERENCES users(guid),
            assigned_to TEXT REFERENCES users(guid),
            source_photo_id TEXT REFERENCES photos(guid),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK ((album_id IS NULL) != (gallery_id IS NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_photos_album ON photos(album_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_photos_gallery ON photos(gallery_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_photos_claimed_by ON photos(claimed_by)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_album_members_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS album_members (
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            album_id TEXT NOT NULL REFERENCES albums(guid) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (user_id, album_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_album_members_album ON album_members(album_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the progress table
///
/// One row per (user, pool). Selections are stored as the flat record
/// claimed_ids / retouch_ids / final_id; nested shapes are never written.
pub async fn create_progress_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS progress (
            guid TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            album_id TEXT REFERENCES albums(guid) ON DELETE CASCADE,
            gallery_id TEXT REFERENCES galleries(guid) ON DELETE CASCADE,
            private_album_id TEXT REFERENCES albums(guid) ON DELETE SET NULL,
            current_step TEXT NOT NULL DEFAULT 'claiming'
                CHECK (current_step IN ('claiming', 'registration', 'retouch', 'tablo', 'completed')),
            claimed_ids TEXT NOT NULL DEFAULT '[]',
            retouch_ids TEXT NOT NULL DEFAULT '[]',
            final_id TEXT,
            claimed_count INTEGER NOT NULL DEFAULT 0,
            retouch_count INTEGER NOT NULL DEFAULT 0,
            finalized_at TEXT,
            modification_count INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK ((album_id IS NULL) != (gallery_id IS NULL)),
            CHECK (claimed_count >= 0),
            CHECK (retouch_count >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_progress_user_album ON progress(user_id, album_id) WHERE album_id IS NOT NULL",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_progress_user_gallery ON progress(user_id, gallery_id) WHERE gallery_id IS NOT NULL",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_progress_private_album ON progress(private_album_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the notification_outbox table
///
/// Outbox rows are written in the same transaction as the data correction
/// they describe; an independent worker drains them.
pub async fn create_notification_outbox_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notification_outbox (
            guid TEXT PRIMARY KEY,
            recipient_user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            template_key TEXT NOT NULL,
            payload TEXT NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            created_at TEXT NOT NULL,
            sent_at TEXT,
            CHECK (attempts >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_outbox_pending ON notification_outbox(sent_at, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist with default values and resets NULL
/// values back to their defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "ws_database_max_lock_wait_ms", "5000").await?;
    ensure_setting(pool, "ws_database_lock_retry_ms", "250").await?;
    ensure_setting(pool, "ws_outbox_poll_interval_ms", "2000").await?;
    ensure_setting(pool, "ws_outbox_max_attempts", "5").await?;
    ensure_setting(pool, "ws_free_edit_window_hours", "72").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // INSERT OR IGNORE handles concurrent initialization races
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}

/// Read an integer setting, falling back to the given default.
pub async fn setting_i64(pool: &SqlitePool, key: &str, default: i64) -> Result<i64> {
    let value: Option<i64> =
        sqlx::query_scalar("SELECT CAST(value AS INTEGER) FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;
    Ok(value.unwrap_or(default))
}
