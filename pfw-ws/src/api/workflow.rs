//! Workflow API handlers
//!
//! Step data, finalize and progress endpoints for both pool generations.
//! The album routes serve the legacy session+album architecture; the
//! gallery routes serve the newer one.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pfw_common::db::WorkflowStep;

use crate::db::progress::ProgressPatch;
use crate::error::{ApiError, ApiResult};
use crate::workflow::{FinalizeSummary, StepData, WorkflowProvider};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

/// Step data plus resolved preview URLs, index-aligned with
/// `data.visible_photos`
#[derive(Debug, Serialize)]
pub struct StepDataResponse {
    #[serde(flatten)]
    pub data: StepData,
    pub photo_urls: Vec<String>,
}

/// POST /workflow/…/finalize request
#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    pub user_id: Uuid,
    pub photo_ids: Vec<Uuid>,
}

/// POST /workflow/…/progress request
#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub user_id: Uuid,
    pub patch: ProgressPatch,
}

fn parse_step(step: &str) -> ApiResult<WorkflowStep> {
    WorkflowStep::parse(step)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown workflow step: {}", step)))
}

fn with_urls(state: &AppState, data: StepData) -> StepDataResponse {
    let photo_urls = state.media.preview_urls(&data.visible_photos);
    StepDataResponse { data, photo_urls }
}

/// GET /workflow/albums/{album_id}/steps/{step}
pub async fn album_step_data(
    State(state): State<AppState>,
    Path((album_id, step)): Path<(Uuid, String)>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<StepDataResponse>> {
    let step = parse_step(&step)?;
    let data = state.albums.step_data(query.user_id, album_id, step).await?;
    Ok(Json(with_urls(&state, data)))
}

/// GET /workflow/galleries/{gallery_id}/steps/{step}
pub async fn gallery_step_data(
    State(state): State<AppState>,
    Path((gallery_id, step)): Path<(Uuid, String)>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<StepDataResponse>> {
    let step = parse_step(&step)?;
    let data = state
        .galleries
        .step_data(query.user_id, gallery_id, step)
        .await?;
    Ok(Json(with_urls(&state, data)))
}

/// POST /workflow/albums/{album_id}/finalize
///
/// Converts the user's provisional claims into exclusive ownership.
/// Contested ids come back in `conflicts`; the call itself succeeds for
/// whatever it could secure.
pub async fn album_finalize(
    State(state): State<AppState>,
    Path(album_id): Path<Uuid>,
    Json(request): Json<FinalizeRequest>,
) -> ApiResult<Json<FinalizeSummary>> {
    if request.photo_ids.is_empty() {
        return Err(ApiError::BadRequest(
            "photo_ids must not be empty".to_string(),
        ));
    }

    let summary = state
        .albums
        .finalize(request.user_id, album_id, &request.photo_ids)
        .await?;

    tracing::info!(
        user_id = %request.user_id,
        album_id = %album_id,
        moved = summary.moved.len(),
        conflicts = summary.conflicts.len(),
        "Album finalize completed"
    );

    Ok(Json(summary))
}

/// POST /workflow/galleries/{gallery_id}/finalize
pub async fn gallery_finalize(
    State(state): State<AppState>,
    Path(gallery_id): Path<Uuid>,
    Json(request): Json<FinalizeRequest>,
) -> ApiResult<Json<FinalizeSummary>> {
    if request.photo_ids.is_empty() {
        return Err(ApiError::BadRequest(
            "photo_ids must not be empty".to_string(),
        ));
    }

    let summary = state
        .galleries
        .finalize(request.user_id, gallery_id, &request.photo_ids)
        .await?;

    Ok(Json(summary))
}

/// POST /workflow/albums/{album_id}/progress
///
/// Merges the patch into the user's progress. Enforcing the step's
/// max_selection before calling is the caller's responsibility.
pub async fn album_progress(
    State(state): State<AppState>,
    Path(album_id): Path<Uuid>,
    Json(request): Json<ProgressRequest>,
) -> ApiResult<Json<pfw_common::db::ProgressRow>> {
    let row = state
        .albums
        .update_progress(request.user_id, album_id, &request.patch)
        .await?;
    Ok(Json(row))
}

/// POST /workflow/galleries/{gallery_id}/progress
pub async fn gallery_progress(
    State(state): State<AppState>,
    Path(gallery_id): Path<Uuid>,
    Json(request): Json<ProgressRequest>,
) -> ApiResult<Json<pfw_common::db::ProgressRow>> {
    let row = state
        .galleries
        .update_progress(request.user_id, gallery_id, &request.patch)
        .await?;
    Ok(Json(row))
}

/// Workflow routes
pub fn workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/workflow/albums/:album_id/steps/:step", get(album_step_data))
        .route("/workflow/albums/:album_id/finalize", post(album_finalize))
        .route("/workflow/albums/:album_id/progress", post(album_progress))
        .route(
            "/workflow/galleries/:gallery_id/steps/:step",
            get(gallery_step_data),
        )
        .route(
            "/workflow/galleries/:gallery_id/finalize",
            post(gallery_finalize),
        )
        .route(
            "/workflow/galleries/:gallery_id/progress",
            post(gallery_progress),
        )
}
