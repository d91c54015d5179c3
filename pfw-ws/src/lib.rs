//! pfw-ws library interface
//!
//! Exposes the workflow core, database queries and HTTP surface for
//! integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod outbox;
pub mod services;
pub mod utils;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use pfw_common::events::EventBus;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::services::{EditWindowPolicy, UrlMediaStore};
use crate::workflow::{AlbumWorkflow, GalleryWorkflow};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for workflow event fan-out
    pub event_bus: EventBus,
    /// Legacy (session+album) workflow provider
    pub albums: Arc<AlbumWorkflow>,
    /// Gallery workflow provider
    pub galleries: Arc<GalleryWorkflow>,
    /// Media reference resolution
    pub media: Arc<UrlMediaStore>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, media_base_url: String) -> Self {
        let albums = Arc::new(AlbumWorkflow::new(db.clone(), event_bus.clone()));
        let galleries = Arc::new(GalleryWorkflow::new(
            db.clone(),
            event_bus.clone(),
            Arc::new(EditWindowPolicy),
        ));
        Self {
            db,
            event_bus,
            albums,
            galleries,
            media: Arc::new(UrlMediaStore::new(media_base_url)),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::workflow_routes())
        .merge(api::health_routes())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
