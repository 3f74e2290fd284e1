//! Content clients for the headless CMS backends.
//!
//! The CMS is consumed as a black box behind the [`ContentSource`]
//! capability trait; one implementation exists per backend and the choice
//! is made once at process startup. [`ContentService`] wraps the selected
//! source with the caching and graceful-degradation policy the rest of the
//! server relies on.

pub mod service;
pub mod strapi;
pub mod wordpress;

pub use service::ContentService;
pub use strapi::StrapiSource;
pub use wordpress::WordPressSource;

use async_trait::async_trait;
use billet_shared::{AdjacentArticles, Article, Category, SiteConfig};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Hard cap on search results, applied by the backend query.
pub const SEARCH_RESULT_LIMIT: usize = 10;

/// Failure taxonomy of a content fetch.
///
/// Not-found is deliberately absent: it is a valid outcome, expressed as
/// `Ok(None)` by the operations that can produce it.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The request never produced a usable HTTP response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("unexpected status: {0}")]
    Status(StatusCode),

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Reader-facing operations a CMS backend must provide.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Published articles, newest publication timestamp first.
    async fn list_articles(&self, limit: Option<usize>) -> Result<Vec<Article>, ContentError>;

    /// Single article lookup; `Ok(None)` drives the 404 page.
    async fn get_article_by_slug(&self, slug: &str) -> Result<Option<Article>, ContentError>;

    async fn list_categories(&self) -> Result<Vec<Category>, ContentError>;

    async fn get_site_config(&self) -> Result<SiteConfig, ContentError>;

    /// Case-insensitive contains match on title or description, newest
    /// first, capped at [`SEARCH_RESULT_LIMIT`].
    async fn search_articles(&self, query: &str) -> Result<Vec<Article>, ContentError>;

    /// Chronological neighbors of the article identified by
    /// `(published_at, id)`.
    async fn adjacent_articles(
        &self,
        published_at: DateTime<Utc>,
        id: &str,
    ) -> Result<AdjacentArticles, ContentError>;

    /// Create-only write path; no read-after-write guarantee.
    async fn subscribe_newsletter(&self, email: &str) -> Result<(), ContentError>;

    /// Create-only write path; no read-after-write guarantee.
    async fn submit_contact(
        &self,
        name: &str,
        email: &str,
        message: &str,
    ) -> Result<(), ContentError>;
}

/// Decode a JSON response, mapping non-success statuses and body mismatches
/// onto the [`ContentError`] taxonomy.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ContentError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ContentError::Status(status));
    }
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ContentError::Decode(e.to_string()))
}
