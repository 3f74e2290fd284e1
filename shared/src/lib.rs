//! Data model shared by the billet content server and its consumers.
//!
//! All entities are owned and mutated by the external CMS; this crate only
//! describes their shape after mapping the raw wire records into typed
//! values. Derived metadata (reading time, headings) is computed on read
//! and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Article body, as delivered by the configured backend.
///
/// Strapi delivers markdown, WordPress delivers rendered HTML. Consumers
/// that need plain text or a table of contents go through the derived
/// metadata calculators instead of inspecting the variant themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", content = "body", rename_all = "lowercase")]
pub enum ArticleContent {
    /// Rendered HTML, served as-is.
    Html(String),
    /// Raw markdown, rendered by the consumer.
    Markdown(String),
}

impl ArticleContent {
    /// Raw body text regardless of format.
    pub fn as_str(&self) -> &str {
        match self {
            ArticleContent::Html(s) | ArticleContent::Markdown(s) => s,
        }
    }
}

/// Full article record.
///
/// `slug` is unique among published articles; `published_at` is the primary
/// ordering key everywhere articles are sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub content: ArticleContent,
    pub cover: Option<ImageRef>,
    pub author: Option<Author>,
    pub categories: Vec<Category>,
    pub published_at: DateTime<Utc>,
}

/// Reference to an image hosted by the CMS, URL already made absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub avatar: Option<ImageRef>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub slug: String,
    pub name: String,
}

/// Minimal article reference used for previous/next navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleLink {
    pub slug: String,
    pub title: String,
}

impl From<&Article> for ArticleLink {
    fn from(a: &Article) -> Self {
        ArticleLink {
            slug: a.slug.clone(),
            title: a.title.clone(),
        }
    }
}

/// Chronological neighbors of an article.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjacentArticles {
    pub previous: Option<ArticleLink>,
    pub next: Option<ArticleLink>,
}

/// Singleton site configuration, created by the CMS operator and read-only
/// here. `SiteConfig::default()` is the hardcoded fallback served whenever
/// the CMS is unreachable, so page rendering never hard-fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub site_name: String,
    pub site_description: String,
    pub site_url: String,
    pub author_name: String,
    pub author_title: String,
    pub social: SocialLinks,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialLinks {
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub twitter: Option<String>,
    pub email: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            site_name: "Mon Blog".to_string(),
            site_description: "Blog personnel".to_string(),
            site_url: "http://localhost:3000".to_string(),
            author_name: "Fabien Laurence".to_string(),
            author_title: "Développeur Full-Stack".to_string(),
            social: SocialLinks {
                github: Some("https://github.com/FabLrc".to_string()),
                linkedin: None,
                twitter: None,
                email: Some("contact@fabienlaurence.com".to_string()),
            },
        }
    }
}

/// One heading of the rendered article body, used for the table of contents
/// and deep links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub id: String,
    pub text: String,
    pub level: u8,
}

/// Metadata derived from an article body on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleMetadata {
    pub reading_time_minutes: u32,
    pub headings: Vec<Heading>,
}
