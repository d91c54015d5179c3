//! Shared test fixtures: a throwaway database seeded with a partner,
//! session, shared album, users and candidate photos.

use pfw_common::db::{Photo, User};
use sqlx::SqlitePool;
use std::sync::Mutex;
use tempfile::TempDir;
use uuid::Uuid;

/// Seeded legacy fixture. Keep the TempDir alive for the database file.
pub struct LegacyFixture {
    pub pool: SqlitePool,
    pub partner_id: Uuid,
    pub session_id: Uuid,
    pub album_id: Uuid,
    pub user_a: User,
    pub user_b: User,
    pub photos: Vec<Uuid>,
    _dir: TempDir,
}

pub async fn setup_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let pool = pfw_common::db::init_database(&dir.path().join("test.db"))
        .await
        .unwrap();
    (pool, dir)
}

pub async fn insert_partner(pool: &SqlitePool, default_max_retouch: Option<u32>) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO partners (guid, name, default_max_retouch) VALUES (?, ?, ?)")
        .bind(id.to_string())
        .bind("Test Studio")
        .bind(default_max_retouch.map(|v| v as i64))
        .execute(pool)
        .await
        .unwrap();
    id
}

pub async fn insert_session(
    pool: &SqlitePool,
    partner_id: Uuid,
    max_retouch_override: Option<u32>,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO sessions (guid, partner_id, name, max_retouch_override) VALUES (?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(partner_id.to_string())
    .bind("Spring shoot")
    .bind(max_retouch_override.map(|v| v as i64))
    .execute(pool)
    .await
    .unwrap();
    id
}

pub async fn insert_shared_album(
    pool: &SqlitePool,
    session_id: Uuid,
    max_retouch: Option<u32>,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO albums (guid, session_id, name, kind, max_retouch) VALUES (?, ?, ?, 'shared', ?)",
    )
    .bind(id.to_string())
    .bind(session_id.to_string())
    .bind("Class pool")
    .bind(max_retouch.map(|v| v as i64))
    .execute(pool)
    .await
    .unwrap();
    id
}

pub async fn insert_gallery(
    pool: &SqlitePool,
    partner_id: Uuid,
    max_retouch: Option<u32>,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO galleries (guid, partner_id, name, max_retouch) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(partner_id.to_string())
        .bind("Gallery pool")
        .bind(max_retouch.map(|v| v as i64))
        .execute(pool)
        .await
        .unwrap();
    id
}

pub async fn insert_user(pool: &SqlitePool, name: &str) -> User {
    let user = User {
        guid: Uuid::new_v4(),
        display_name: name.to_string(),
        email: format!("{}@example.test", name.to_lowercase()),
    };
    pfw_ws::db::users::insert_user(pool, &user).await.unwrap();
    user
}

pub async fn insert_album_photo(pool: &SqlitePool, album_id: Uuid, n: usize) -> Uuid {
    let photo = Photo {
        guid: Uuid::new_v4(),
        album_id: Some(album_id),
        gallery_id: None,
        media_ref: format!("shoot/img_{:04}.jpg", n),
        claimed_by: None,
        assigned_to: None,
        source_photo_id: None,
    };
    pfw_ws::db::photos::insert_photo(pool, &photo).await.unwrap();
    photo.guid
}

pub async fn insert_gallery_photo(pool: &SqlitePool, gallery_id: Uuid, n: usize) -> Uuid {
    let photo = Photo {
        guid: Uuid::new_v4(),
        album_id: None,
        gallery_id: Some(gallery_id),
        media_ref: format!("gallery/img_{:04}.jpg", n),
        claimed_by: None,
        assigned_to: None,
        source_photo_id: None,
    };
    pfw_ws::db::photos::insert_photo(pool, &photo).await.unwrap();
    photo.guid
}

/// Partner + session + shared album with three photos and two attached users
pub async fn seed_legacy() -> LegacyFixture {
    let (pool, dir) = setup_db().await;

    let partner_id = insert_partner(&pool, None).await;
    let session_id = insert_session(&pool, partner_id, None).await;
    let album_id = insert_shared_album(&pool, session_id, None).await;

    let user_a = insert_user(&pool, "Anna").await;
    let user_b = insert_user(&pool, "Bela").await;
    pfw_ws::db::albums::attach_member(&pool, user_a.guid, album_id)
        .await
        .unwrap();
    pfw_ws::db::albums::attach_member(&pool, user_b.guid, album_id)
        .await
        .unwrap();

    let mut photos = Vec::new();
    for n in 1..=3 {
        photos.push(insert_album_photo(&pool, album_id, n).await);
    }

    LegacyFixture {
        pool,
        partner_id,
        session_id,
        album_id,
        user_a,
        user_b,
        photos,
        _dir: dir,
    }
}

/// Email sender double that records sends and fails on demand
pub struct RecordingSender {
    pub fail: Mutex<bool>,
    pub sent: Mutex<Vec<(String, String, serde_json::Value)>>,
}

impl RecordingSender {
    pub fn new(fail: bool) -> Self {
        Self {
            fail: Mutex::new(fail),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl pfw_ws::services::EmailSender for RecordingSender {
    async fn send(
        &self,
        template_key: &str,
        recipient_address: &str,
        variables: &serde_json::Value,
    ) -> pfw_common::Result<()> {
        if *self.fail.lock().unwrap() {
            return Err(pfw_common::Error::Internal(
                "relay unavailable".to_string(),
            ));
        }
        self.sent.lock().unwrap().push((
            template_key.to_string(),
            recipient_address.to_string(),
            variables.clone(),
        ));
        Ok(())
    }
}
