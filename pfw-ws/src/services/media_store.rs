//! Media reference resolution seam

use pfw_common::db::Photo;
use pfw_common::Result;

/// Resolves photo media references to servable URLs
#[async_trait::async_trait]
pub trait MediaStore: Send + Sync {
    /// List the media references of a collection under a pool
    async fn list_photos(&self, pool_id: &str, collection: &str) -> Result<Vec<String>>;

    /// Resolve a media reference to a URL for the given variant
    /// (e.g. "thumb", "preview", "full")
    fn url(&self, media_ref: &str, variant: &str) -> String;
}

/// Production store: resolves references against a configured base URL
pub struct UrlMediaStore {
    base_url: String,
}

impl UrlMediaStore {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Attach resolved preview URLs to photos for an API response
    pub fn preview_urls(&self, photos: &[Photo]) -> Vec<String> {
        photos
            .iter()
            .map(|photo| self.url(&photo.media_ref, "preview"))
            .collect()
    }
}

#[async_trait::async_trait]
impl MediaStore for UrlMediaStore {
    async fn list_photos(&self, pool_id: &str, collection: &str) -> Result<Vec<String>> {
        // The workflow's own pool tables are authoritative; this listing
        // only exists for collaborators that mirror media externally.
        tracing::debug!(pool_id, collection, "Media listing requested");
        Ok(Vec::new())
    }

    fn url(&self, media_ref: &str, variant: &str) -> String {
        format!("{}/{}/{}", self.base_url, variant, media_ref)
    }
}
