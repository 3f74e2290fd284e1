use std::{env, fmt, time::Duration};

use anyhow::{bail, Result};

/// Which headless CMS the content client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentBackend {
    Strapi,
    WordPress,
}

impl fmt::Display for ContentBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentBackend::Strapi => write!(f, "strapi"),
            ContentBackend::WordPress => write!(f, "wordpress"),
        }
    }
}

/// Process configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: String,
    pub app_env: String,
    pub site_url: String,
    pub backend: ContentBackend,
    pub strapi_url: String,
    pub wordpress_api_url: Option<String>,
    pub revalidate_secret: Option<String>,
    pub github_token: Option<String>,
    pub github_api_url: String,
    pub star_cache_ttl: Duration,
    pub http_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bind_addr: "0.0.0.0".to_string(),
            port: "3000".to_string(),
            app_env: "development".to_string(),
            site_url: "http://localhost:3000".to_string(),
            backend: ContentBackend::Strapi,
            strapi_url: "http://localhost:1337".to_string(),
            wordpress_api_url: None,
            revalidate_secret: None,
            github_token: None,
            github_api_url: "https://api.github.com".to_string(),
            star_cache_ttl: Duration::from_secs(3600),
            http_timeout: Duration::from_secs(10),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults above for anything unset.
    pub fn from_env() -> Result<Self> {
        let defaults = AppConfig::default();

        let backend = match env::var("CONTENT_BACKEND")
            .unwrap_or_else(|_| "strapi".to_string())
            .to_lowercase()
            .as_str()
        {
            "strapi" => ContentBackend::Strapi,
            "wordpress" => ContentBackend::WordPress,
            other => bail!("unsupported CONTENT_BACKEND: {other}"),
        };

        let wordpress_api_url = non_empty_var("WORDPRESS_API_URL");
        if backend == ContentBackend::WordPress && wordpress_api_url.is_none() {
            bail!("WORDPRESS_API_URL is required when CONTENT_BACKEND=wordpress");
        }

        Ok(AppConfig {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: env::var("PORT").unwrap_or(defaults.port),
            app_env: env::var("APP_ENV").unwrap_or(defaults.app_env),
            site_url: env::var("SITE_URL").unwrap_or(defaults.site_url),
            backend,
            strapi_url: env::var("STRAPI_URL").unwrap_or(defaults.strapi_url),
            wordpress_api_url,
            revalidate_secret: non_empty_var("REVALIDATE_SECRET_TOKEN"),
            github_token: non_empty_var("GITHUB_TOKEN"),
            github_api_url: env::var("GITHUB_API_URL").unwrap_or(defaults.github_api_url),
            star_cache_ttl: Duration::from_secs(parse_secs_var("GITHUB_CACHE_TTL_SECONDS", 3600)),
            http_timeout: Duration::from_secs(parse_secs_var("HTTP_TIMEOUT_SECONDS", 10)),
        })
    }

    /// The GET revalidation probe is only served in development.
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_secs_var(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_local_strapi() {
        let config = AppConfig::default();
        assert_eq!(config.backend, ContentBackend::Strapi);
        assert_eq!(config.strapi_url, "http://localhost:1337");
        assert_eq!(config.site_url, "http://localhost:3000");
        assert!(config.is_development());
    }

    #[test]
    fn backend_names_render_lowercase() {
        assert_eq!(ContentBackend::Strapi.to_string(), "strapi");
        assert_eq!(ContentBackend::WordPress.to_string(), "wordpress");
    }
}
