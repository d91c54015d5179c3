//! Workflow facade
//!
//! One provider contract, two storage generations. `AlbumWorkflow` is the
//! legacy session+album architecture with the transactional claim engine
//! and private sub-pools; `GalleryWorkflow` tracks ownership purely as ID
//! sets in progress, so conflicts cannot arise there.

use pfw_common::db::{Album, AlbumKind, Photo, ProgressRow, WorkflowStep};
use pfw_common::events::{EventBus, WorkflowEvent};
use pfw_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{albums, galleries, photos, progress, users};
use crate::services::BillingPolicy;
use crate::utils::retry_on_lock;
use crate::workflow::claim_engine::{finalize_claims, FinalizeOutcome};
use crate::workflow::pool_view;
use crate::workflow::step_policy::{self, StepMetadata};

/// Counts and limits of the pool a step operates on
#[derive(Debug, Clone, Serialize)]
pub struct PoolSummary {
    pub pool_id: Uuid,
    pub name: String,
    pub photo_count: usize,
    pub max_retouch: u32,
}

/// Grouped review subsets for the gallery completed step
#[derive(Debug, Clone, Serialize)]
pub struct CompletedReview {
    pub claimed: Vec<Photo>,
    pub retouch: Vec<Photo>,
    pub final_photo: Option<Photo>,
}

/// Free-edit window summary, delegated to the billing policy
#[derive(Debug, Clone, Serialize)]
pub struct ModificationWindow {
    pub within_free_window: bool,
    pub remaining_seconds: i64,
}

/// Everything a step screen needs
#[derive(Debug, Clone, Serialize)]
pub struct StepData {
    pub current_step: WorkflowStep,
    pub visible_photos: Vec<Photo>,
    pub selected_photos: Vec<Uuid>,
    pub step_metadata: StepMetadata,
    pub pool_id: Uuid,
    pub progress: Option<ProgressRow>,
    pub pool_summary: PoolSummary,
    /// Gallery completed step only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<CompletedReview>,
    /// Gallery completed step only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_window: Option<ModificationWindow>,
}

/// Result of a finalize call through the facade
#[derive(Debug, Clone, Serialize)]
pub struct FinalizeSummary {
    /// The pool the user works in from now on (the private sub-pool for
    /// the legacy generation, the gallery itself otherwise)
    pub pool_id: Uuid,
    pub moved: Vec<Uuid>,
    pub conflicts: Vec<Uuid>,
    /// Original id → private-pool id (legacy generation only, empty
    /// otherwise)
    pub id_mapping: HashMap<Uuid, Uuid>,
}

/// The external workflow contract, one implementation per storage
/// generation
#[async_trait::async_trait]
pub trait WorkflowProvider: Send + Sync {
    async fn step_data(&self, user_id: Uuid, pool_id: Uuid, step: WorkflowStep)
        -> Result<StepData>;

    async fn finalize(
        &self,
        user_id: Uuid,
        pool_id: Uuid,
        requested: &[Uuid],
    ) -> Result<FinalizeSummary>;

    async fn update_progress(
        &self,
        user_id: Uuid,
        pool_id: Uuid,
        patch: &progress::ProgressPatch,
    ) -> Result<ProgressRow>;
}

/// Legacy generation: session+album pools, private sub-pools at finalize
pub struct AlbumWorkflow {
    db: SqlitePool,
    events: EventBus,
}

impl AlbumWorkflow {
    pub fn new(db: SqlitePool, events: EventBus) -> Self {
        Self { db, events }
    }

    /// Normalize any album reference (shared or private) onto its shared
    /// parent
    async fn shared_parent(&self, album: &Album) -> Result<Album> {
        match (album.kind, album.parent_album_id) {
            (AlbumKind::Shared, _) => Ok(album.clone()),
            (AlbumKind::Private, Some(parent_id)) => albums::get_album(&self.db, parent_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Parent album not found: {}", parent_id))),
            (AlbumKind::Private, None) => Err(Error::Internal(format!(
                "Private album {} has no parent",
                album.guid
            ))),
        }
    }

    /// The album a step operates on: the shared parent while claiming,
    /// the user's private sub-pool once it exists, the parent otherwise.
    async fn scope_album(
        &self,
        user_id: Uuid,
        parent: &Album,
        step: WorkflowStep,
    ) -> Result<Album> {
        if step.canonical() == WorkflowStep::Claiming {
            return Ok(parent.clone());
        }
        match albums::find_private_album(&self.db, user_id, parent.guid).await? {
            Some(private) => Ok(private),
            None => Ok(parent.clone()),
        }
    }
}

#[async_trait::async_trait]
impl WorkflowProvider for AlbumWorkflow {
    async fn step_data(
        &self,
        user_id: Uuid,
        pool_id: Uuid,
        step: WorkflowStep,
    ) -> Result<StepData> {
        let album = albums::get_album(&self.db, pool_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Album not found: {}", pool_id)))?;
        let parent = self.shared_parent(&album).await?;

        let progress_row = progress::get_for_album(&self.db, user_id, parent.guid).await?;
        let scope = self.scope_album(user_id, &parent, step).await?;

        // Tombstones stay out of the shared pool; a private pool shows
        // everything it holds.
        let pool_photos = match scope.kind {
            AlbumKind::Shared => photos::list_available_album_photos(&self.db, scope.guid).await?,
            AlbumKind::Private => photos::list_album_photos(&self.db, scope.guid).await?,
        };

        let max_retouch = albums::resolve_max_retouch(&self.db, &parent).await?;
        let visible = pool_view::visible_photos(&pool_photos, step, progress_row.as_ref());
        let selected = pool_view::selected_ids(step, progress_row.as_ref());

        Ok(StepData {
            current_step: progress_row
                .as_ref()
                .map(|p| p.current_step)
                .unwrap_or(WorkflowStep::Claiming),
            selected_photos: selected,
            step_metadata: step_policy::metadata(step, max_retouch),
            pool_id: scope.guid,
            pool_summary: PoolSummary {
                pool_id: scope.guid,
                name: scope.name.clone(),
                photo_count: pool_photos.len(),
                max_retouch,
            },
            visible_photos: visible,
            progress: progress_row,
            review: None,
            modification_window: None,
        })
    }

    async fn finalize(
        &self,
        user_id: Uuid,
        pool_id: Uuid,
        requested: &[Uuid],
    ) -> Result<FinalizeSummary> {
        let album = albums::get_album(&self.db, pool_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Album not found: {}", pool_id)))?;
        let parent = self.shared_parent(&album).await?;
        let user = users::get_user(&self.db, user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User not found: {}", user_id)))?;

        let prior = progress::get_for_album(&self.db, user_id, parent.guid).await?;
        if prior.as_ref().is_some_and(|p| p.finalized_at.is_some()) {
            return Err(Error::InvalidInput(format!(
                "User {} already finalized against album {}",
                user_id, parent.guid
            )));
        }

        let max_wait_ms =
            pfw_common::db::setting_i64(&self.db, "ws_database_max_lock_wait_ms", 5000).await?;

        let outcome: FinalizeOutcome = retry_on_lock("finalize claims", max_wait_ms as u64, || {
            finalize_claims(&self.db, &user, &parent, requested)
        })
        .await?;

        // The winner now works in the private sub-pool: remap the stored
        // selections onto the duplicated photo ids, dropping conflicted
        // ones.
        let remap = |ids: &[Uuid]| -> Vec<Uuid> {
            ids.iter()
                .filter_map(|id| outcome.id_mapping.get(id).copied())
                .collect()
        };
        let claimed: Vec<Uuid> = remap(&outcome.moved);
        let (retouch, final_id) = match &prior {
            Some(p) => (
                remap(&p.selection.retouch),
                p.selection.final_id.and_then(|id| outcome.id_mapping.get(&id).copied()),
            ),
            None => (Vec::new(), None),
        };

        progress::upsert_for_album(
            &self.db,
            user_id,
            parent.guid,
            &progress::ProgressPatch {
                current_step: Some(WorkflowStep::Retouch),
                claimed_ids: Some(claimed),
                retouch_ids: Some(retouch),
                final_id: Some(final_id),
                private_album_id: Some(outcome.private_album_id),
                finalized_at: Some(chrono::Utc::now()),
            },
        )
        .await?;

        for correction in &outcome.corrections {
            self.events.publish(WorkflowEvent::PhotosReclaimed {
                user_id: correction.user_id,
                pool_id: parent.guid,
                removed: correction.removed.clone(),
                winner_id: user_id,
                timestamp: chrono::Utc::now(),
            });
        }
        self.events.publish(WorkflowEvent::FinalizeCompleted {
            user_id,
            pool_id: parent.guid,
            moved: outcome.moved.len(),
            conflicts: outcome.conflicts.len(),
            timestamp: chrono::Utc::now(),
        });

        Ok(FinalizeSummary {
            pool_id: outcome.private_album_id,
            moved: outcome.moved,
            conflicts: outcome.conflicts,
            id_mapping: outcome.id_mapping,
        })
    }

    async fn update_progress(
        &self,
        user_id: Uuid,
        pool_id: Uuid,
        patch: &progress::ProgressPatch,
    ) -> Result<ProgressRow> {
        let album = albums::get_album(&self.db, pool_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Album not found: {}", pool_id)))?;
        let parent = self.shared_parent(&album).await?;

        let row = progress::upsert_for_album(&self.db, user_id, parent.guid, patch).await?;

        self.events.publish(WorkflowEvent::ProgressUpdated {
            user_id,
            pool_id: parent.guid,
            timestamp: chrono::Utc::now(),
        });

        Ok(row)
    }
}

/// Newer generation: gallery pools, ownership as ID sets in progress
pub struct GalleryWorkflow {
    db: SqlitePool,
    events: EventBus,
    billing: Arc<dyn BillingPolicy>,
}

impl GalleryWorkflow {
    pub fn new(db: SqlitePool, events: EventBus, billing: Arc<dyn BillingPolicy>) -> Self {
        Self { db, events, billing }
    }

    fn review(pool_photos: &[Photo], progress: &ProgressRow) -> CompletedReview {
        let by_ids = |ids: &[Uuid]| -> Vec<Photo> {
            pool_photos
                .iter()
                .filter(|p| ids.contains(&p.guid))
                .cloned()
                .collect()
        };
        CompletedReview {
            claimed: by_ids(&progress.selection.claimed),
            retouch: by_ids(&progress.selection.retouch),
            final_photo: progress
                .selection
                .final_id
                .and_then(|id| pool_photos.iter().find(|p| p.guid == id).cloned()),
        }
    }
}

#[async_trait::async_trait]
impl WorkflowProvider for GalleryWorkflow {
    async fn step_data(
        &self,
        user_id: Uuid,
        pool_id: Uuid,
        step: WorkflowStep,
    ) -> Result<StepData> {
        let gallery = galleries::get_gallery(&self.db, pool_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Gallery not found: {}", pool_id)))?;

        let progress_row = progress::get_for_gallery(&self.db, user_id, gallery.guid).await?;
        let pool_photos = photos::list_gallery_photos(&self.db, gallery.guid).await?;
        let max_retouch = galleries::resolve_max_retouch(&self.db, &gallery).await?;

        let visible = pool_view::visible_photos(&pool_photos, step, progress_row.as_ref());
        let selected = pool_view::selected_ids(step, progress_row.as_ref());

        let (review, modification_window) = match (&progress_row, step.canonical()) {
            (Some(p), WorkflowStep::Completed) => {
                let hours =
                    pfw_common::db::setting_i64(&self.db, "ws_free_edit_window_hours", 72).await?
                        as u32;
                (
                    Some(Self::review(&pool_photos, p)),
                    Some(ModificationWindow {
                        within_free_window: self.billing.is_within_free_edit_window(p, hours),
                        remaining_seconds: self.billing.remaining_seconds(p, hours),
                    }),
                )
            }
            _ => (None, None),
        };

        Ok(StepData {
            current_step: progress_row
                .as_ref()
                .map(|p| p.current_step)
                .unwrap_or(WorkflowStep::Claiming),
            selected_photos: selected,
            step_metadata: step_policy::metadata(step, max_retouch),
            pool_id: gallery.guid,
            pool_summary: PoolSummary {
                pool_id: gallery.guid,
                name: gallery.name.clone(),
                photo_count: pool_photos.len(),
                max_retouch,
            },
            visible_photos: visible,
            progress: progress_row,
            review,
            modification_window,
        })
    }

    async fn finalize(
        &self,
        user_id: Uuid,
        pool_id: Uuid,
        requested: &[Uuid],
    ) -> Result<FinalizeSummary> {
        let gallery = galleries::get_gallery(&self.db, pool_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Gallery not found: {}", pool_id)))?;

        // Ownership is tracked purely as ID sets here; nothing is
        // duplicated and no claim can conflict.
        progress::upsert_for_gallery(
            &self.db,
            user_id,
            gallery.guid,
            &progress::ProgressPatch {
                current_step: Some(WorkflowStep::Retouch),
                claimed_ids: Some(requested.to_vec()),
                finalized_at: Some(chrono::Utc::now()),
                ..Default::default()
            },
        )
        .await?;

        self.events.publish(WorkflowEvent::FinalizeCompleted {
            user_id,
            pool_id: gallery.guid,
            moved: requested.len(),
            conflicts: 0,
            timestamp: chrono::Utc::now(),
        });

        Ok(FinalizeSummary {
            pool_id: gallery.guid,
            moved: requested.to_vec(),
            conflicts: Vec::new(),
            id_mapping: HashMap::new(),
        })
    }

    async fn update_progress(
        &self,
        user_id: Uuid,
        pool_id: Uuid,
        patch: &progress::ProgressPatch,
    ) -> Result<ProgressRow> {
        let gallery = galleries::get_gallery(&self.db, pool_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Gallery not found: {}", pool_id)))?;

        let row = progress::upsert_for_gallery(&self.db, user_id, gallery.guid, patch).await?;

        self.events.publish(WorkflowEvent::ProgressUpdated {
            user_id,
            pool_id: gallery.guid,
            timestamp: chrono::Utc::now(),
        });

        Ok(row)
    }
}
