//! Caching and graceful-degradation wrapper around a [`ContentSource`].
//!
//! Page availability wins over freshness under CMS outage: every read
//! degrades to an empty or default value instead of propagating its error,
//! which is logged here and nowhere else. Only the two write paths
//! (newsletter, contact) surface their errors, so the handlers can answer
//! with a real status code.

use std::time::Duration;

use billet_shared::{AdjacentArticles, Article, Category, SiteConfig};
use chrono::{DateTime, Utc};

use super::{ContentError, ContentSource};
use crate::cache::TtlCache;

/// Staleness window for article and category reads.
pub const ARTICLE_TTL: Duration = Duration::from_secs(60);
/// Staleness window for the site configuration singleton.
pub const SITE_CONFIG_TTL: Duration = Duration::from_secs(3600);

const CATEGORIES_KEY: &str = "categories";
const SITE_CONFIG_KEY: &str = "site-config";

pub struct ContentService {
    source: Box<dyn ContentSource>,
    lists: TtlCache<String, Vec<Article>>,
    articles: TtlCache<String, Option<Article>>,
    categories: TtlCache<String, Vec<Category>>,
    site_config: TtlCache<String, SiteConfig>,
}

impl ContentService {
    pub fn new(source: Box<dyn ContentSource>) -> Self {
        ContentService {
            source,
            lists: TtlCache::new(ARTICLE_TTL),
            articles: TtlCache::new(ARTICLE_TTL),
            categories: TtlCache::new(ARTICLE_TTL),
            site_config: TtlCache::new(SITE_CONFIG_TTL),
        }
    }

    /// Published articles, newest first. Empty on any backend failure.
    pub async fn list_articles(&self, limit: Option<usize>) -> Vec<Article> {
        let key = match limit {
            Some(n) => format!("limit:{n}"),
            None => "all".to_string(),
        };
        if let Some(cached) = self.lists.get(&key) {
            return cached;
        }
        match self.source.list_articles(limit).await {
            Ok(mut articles) => {
                // Backends already order by date; re-sorting keeps the
                // newest-first invariant even when one does not.
                articles.sort_by(|a, b| {
                    b.published_at
                        .cmp(&a.published_at)
                        .then_with(|| b.id.cmp(&a.id))
                });
                self.lists.insert(key, articles.clone());
                articles
            }
            Err(err) => {
                tracing::error!("failed to fetch articles: {err}");
                Vec::new()
            }
        }
    }

    /// Single article lookup. `None` covers both not-found and a logged
    /// backend failure; callers render the 404 page either way.
    pub async fn get_article(&self, slug: &str) -> Option<Article> {
        let key = slug.to_string();
        if let Some(cached) = self.articles.get(&key) {
            return cached;
        }
        match self.source.get_article_by_slug(slug).await {
            Ok(article) => {
                self.articles.insert(key, article.clone());
                article
            }
            Err(err) => {
                tracing::error!("failed to fetch article {slug}: {err}");
                None
            }
        }
    }

    pub async fn list_categories(&self) -> Vec<Category> {
        if let Some(cached) = self.categories.get(&CATEGORIES_KEY.to_string()) {
            return cached;
        }
        match self.source.list_categories().await {
            Ok(categories) => {
                self.categories
                    .insert(CATEGORIES_KEY.to_string(), categories.clone());
                categories
            }
            Err(err) => {
                tracing::error!("failed to fetch categories: {err}");
                Vec::new()
            }
        }
    }

    /// Site configuration, falling back to the hardcoded default so that
    /// page rendering never hard-fails on CMS unavailability.
    pub async fn site_config(&self) -> SiteConfig {
        if let Some(cached) = self.site_config.get(&SITE_CONFIG_KEY.to_string()) {
            return cached;
        }
        match self.source.get_site_config().await {
            Ok(config) => {
                self.site_config
                    .insert(SITE_CONFIG_KEY.to_string(), config.clone());
                config
            }
            Err(err) => {
                tracing::error!("failed to fetch site config, using fallback: {err}");
                SiteConfig::default()
            }
        }
    }

    /// Search is never cached; an empty or whitespace-only query
    /// short-circuits without touching the network.
    pub async fn search(&self, query: &str) -> Vec<Article> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        match self.source.search_articles(trimmed).await {
            Ok(results) => results,
            Err(err) => {
                tracing::error!("search failed for {trimmed:?}: {err}");
                Vec::new()
            }
        }
    }

    pub async fn adjacent(&self, published_at: DateTime<Utc>, id: &str) -> AdjacentArticles {
        match self.source.adjacent_articles(published_at, id).await {
            Ok(adjacent) => adjacent,
            Err(err) => {
                tracing::error!("failed to resolve adjacent articles for {id}: {err}");
                AdjacentArticles::default()
            }
        }
    }

    pub async fn subscribe_newsletter(&self, email: &str) -> Result<(), ContentError> {
        self.source.subscribe_newsletter(email).await
    }

    pub async fn submit_contact(
        &self,
        name: &str,
        email: &str,
        message: &str,
    ) -> Result<(), ContentError> {
        self.source.submit_contact(name, email, message).await
    }

    /// Drop the cached home/blog-index data (article lists, categories).
    pub fn invalidate_lists(&self) {
        self.lists.clear();
        self.categories.clear();
    }

    /// Drop one article's cached entry.
    pub fn invalidate_article(&self, slug: &str) {
        self.articles.invalidate(&slug.to_string());
    }
}
