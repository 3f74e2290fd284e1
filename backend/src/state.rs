use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cache::TtlCache;
use crate::config::{AppConfig, ContentBackend};
use crate::content::{ContentService, ContentSource, StrapiSource, WordPressSource};

const USER_AGENT: &str = concat!("billet/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct AppState {
    /// Cached, degradation-wrapped content client.
    content: Arc<ContentService>,
    /// Star counts by repo name, stale entries kept for error fallback.
    stars: Arc<TtlCache<String, u64>>,
    http: reqwest::Client,
    config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.http_timeout)
            .build()
            .context("failed to build http client")?;

        let source: Box<dyn ContentSource> = match config.backend {
            ContentBackend::Strapi => {
                Box::new(StrapiSource::new(&config.strapi_url, http.clone())?)
            }
            ContentBackend::WordPress => {
                let endpoint = config
                    .wordpress_api_url
                    .as_deref()
                    .context("WORDPRESS_API_URL is required for the wordpress backend")?;
                Box::new(WordPressSource::new(endpoint, http.clone())?)
            }
        };

        Ok(AppState {
            content: Arc::new(ContentService::new(source)),
            stars: Arc::new(TtlCache::new(config.star_cache_ttl)),
            http,
            config: Arc::new(config),
        })
    }

    pub fn content(&self) -> &ContentService {
        &self.content
    }

    pub fn stars(&self) -> &TtlCache<String, u64> {
        &self.stars
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
