//! Strapi REST client.
//!
//! Talks to the Strapi content API with its query-string filter surface
//! (`filters[field][$op]=value`, `populate[n]=relation`, `sort[n]=field:dir`,
//! `pagination[limit]=n`) and unwraps the `{ data, meta }` envelope.

use async_trait::async_trait;
use billet_shared::{
    AdjacentArticles, Article, ArticleContent, ArticleLink, Author, Category, ImageRef,
    SiteConfig, SocialLinks,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

use super::{read_json, ContentError, ContentSource, SEARCH_RESULT_LIMIT};

const LIST_POPULATE: &str = "populate[0]=cover&populate[1]=categories&populate[2]=author.avatar";

pub struct StrapiSource {
    base: Url,
    client: reqwest::Client,
}

impl StrapiSource {
    pub fn new(base_url: &str, client: reqwest::Client) -> anyhow::Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("invalid STRAPI_URL {base_url:?}: {e}"))?;
        Ok(StrapiSource { base, client })
    }

    fn api_url(&self, path_and_query: &str) -> String {
        format!(
            "{}/api/{}",
            self.base.as_str().trim_end_matches('/'),
            path_and_query
        )
    }

    /// Uploads come back as paths relative to the CMS host.
    fn resolve_image(&self, image: RawImage) -> ImageRef {
        let url = if image.url.starts_with("http") {
            image.url
        } else {
            format!("{}{}", self.base.as_str().trim_end_matches('/'), image.url)
        };
        ImageRef {
            url,
            alt: image.alternative_text,
        }
    }

    fn map_article(&self, raw: RawArticle) -> Article {
        let id = raw
            .document_id
            .or_else(|| raw.id.map(|n| n.to_string()))
            .unwrap_or_else(|| raw.slug.clone());
        // Older content types carried a single category relation.
        let categories = if raw.categories.is_empty() {
            raw.category.into_iter().map(map_category).collect()
        } else {
            raw.categories.into_iter().map(map_category).collect()
        };
        Article {
            id,
            slug: raw.slug,
            title: raw.title,
            description: raw.description,
            content: ArticleContent::Markdown(raw.content.unwrap_or_default()),
            cover: raw.cover.map(|image| self.resolve_image(image)),
            author: raw.author.map(|author| Author {
                name: author.name,
                avatar: author.avatar.map(|image| self.resolve_image(image)),
                bio: author.bio,
            }),
            categories,
            published_at: raw.published_at,
        }
    }

    async fn fetch_neighbor(
        &self,
        published_at: DateTime<Utc>,
        id: &str,
        direction: Neighbor,
    ) -> Result<Option<ArticleLink>, ContentError> {
        let (op, dir) = match direction {
            Neighbor::Previous => ("$lt", "desc"),
            Neighbor::Next => ("$gt", "asc"),
        };
        let stamp = published_at.to_rfc3339();
        let stamp = urlencoding::encode(&stamp);
        let ident = urlencoding::encode(id);
        // Total order is (publishedAt, documentId): strictly on the target
        // side of the timestamp, or same timestamp with the id breaking the
        // tie.
        let query = format!(
            "articles?filters[$or][0][publishedAt][{op}]={stamp}\
             &filters[$or][1][publishedAt][$eq]={stamp}\
             &filters[$or][1][documentId][{op}]={ident}\
             &sort[0]=publishedAt:{dir}&sort[1]=documentId:{dir}\
             &fields[0]=slug&fields[1]=title&pagination[limit]=1"
        );
        let response = self.client.get(self.api_url(&query)).send().await?;
        let envelope: Envelope<Vec<RawLink>> = read_json(response).await?;
        Ok(envelope.data.into_iter().next().map(|raw| ArticleLink {
            slug: raw.slug,
            title: raw.title,
        }))
    }
}

#[derive(Clone, Copy)]
enum Neighbor {
    Previous,
    Next,
}

#[async_trait]
impl ContentSource for StrapiSource {
    async fn list_articles(&self, limit: Option<usize>) -> Result<Vec<Article>, ContentError> {
        let mut query = format!("articles?{LIST_POPULATE}&sort[0]=publishedAt:desc");
        if let Some(limit) = limit {
            query.push_str(&format!("&pagination[limit]={limit}"));
        }
        let response = self.client.get(self.api_url(&query)).send().await?;
        let envelope: Envelope<Vec<RawArticle>> = read_json(response).await?;
        Ok(envelope
            .data
            .into_iter()
            .map(|raw| self.map_article(raw))
            .collect())
    }

    async fn get_article_by_slug(&self, slug: &str) -> Result<Option<Article>, ContentError> {
        let query = format!(
            "articles?filters[slug][$eq]={}&{LIST_POPULATE}",
            urlencoding::encode(slug)
        );
        let response = self.client.get(self.api_url(&query)).send().await?;
        let envelope: Envelope<Vec<RawArticle>> = read_json(response).await?;
        Ok(envelope
            .data
            .into_iter()
            .next()
            .map(|raw| self.map_article(raw)))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ContentError> {
        let response = self
            .client
            .get(self.api_url("categories?sort[0]=name:asc"))
            .send()
            .await?;
        let envelope: Envelope<Vec<RawCategory>> = read_json(response).await?;
        Ok(envelope.data.into_iter().map(map_category).collect())
    }

    async fn get_site_config(&self) -> Result<SiteConfig, ContentError> {
        let response = self
            .client
            .get(self.api_url("global?populate[0]=social"))
            .send()
            .await?;
        let envelope: Envelope<RawGlobal> = read_json(response).await?;
        let raw = envelope.data;
        let defaults = SiteConfig::default();
        Ok(SiteConfig {
            site_name: raw.site_name,
            site_description: raw.site_description,
            site_url: raw.site_url.unwrap_or(defaults.site_url),
            author_name: raw.author_name.unwrap_or(defaults.author_name),
            author_title: raw.author_title.unwrap_or(defaults.author_title),
            social: raw
                .social
                .map(|social| SocialLinks {
                    github: social.github,
                    linkedin: social.linkedin,
                    twitter: social.twitter,
                    email: social.email,
                })
                .unwrap_or(defaults.social),
        })
    }

    async fn search_articles(&self, query: &str) -> Result<Vec<Article>, ContentError> {
        let q = urlencoding::encode(query);
        let query = format!(
            "articles?filters[$or][0][title][$containsi]={q}\
             &filters[$or][1][description][$containsi]={q}\
             &{LIST_POPULATE}&sort[0]=publishedAt:desc\
             &pagination[limit]={SEARCH_RESULT_LIMIT}"
        );
        let response = self.client.get(self.api_url(&query)).send().await?;
        let envelope: Envelope<Vec<RawArticle>> = read_json(response).await?;
        Ok(envelope
            .data
            .into_iter()
            .map(|raw| self.map_article(raw))
            .collect())
    }

    async fn adjacent_articles(
        &self,
        published_at: DateTime<Utc>,
        id: &str,
    ) -> Result<AdjacentArticles, ContentError> {
        let (previous, next) = tokio::join!(
            self.fetch_neighbor(published_at, id, Neighbor::Previous),
            self.fetch_neighbor(published_at, id, Neighbor::Next),
        );
        Ok(AdjacentArticles {
            previous: previous?,
            next: next?,
        })
    }

    async fn subscribe_newsletter(&self, email: &str) -> Result<(), ContentError> {
        let response = self
            .client
            .post(self.api_url("subscribers"))
            .json(&serde_json::json!({ "data": { "email": email } }))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ContentError::Status(status))
        }
    }

    async fn submit_contact(
        &self,
        name: &str,
        email: &str,
        message: &str,
    ) -> Result<(), ContentError> {
        let response = self
            .client
            .post(self.api_url("contact-messages"))
            .json(&serde_json::json!({
                "data": { "name": name, "email": email, "message": message }
            }))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ContentError::Status(status))
        }
    }
}

fn map_category(raw: RawCategory) -> Category {
    let id = raw
        .document_id
        .or_else(|| raw.id.map(|n| n.to_string()))
        .unwrap_or_else(|| raw.slug.clone());
    Category {
        id,
        slug: raw.slug,
        name: raw.name,
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    document_id: Option<String>,
    title: String,
    #[serde(default)]
    description: String,
    slug: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    cover: Option<RawImage>,
    #[serde(default)]
    author: Option<RawAuthor>,
    #[serde(default)]
    categories: Vec<RawCategory>,
    #[serde(default)]
    category: Option<RawCategory>,
    published_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawImage {
    url: String,
    #[serde(default)]
    alternative_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    name: String,
    #[serde(default)]
    avatar: Option<RawImage>,
    #[serde(default)]
    bio: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCategory {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    document_id: Option<String>,
    name: String,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct RawLink {
    slug: String,
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGlobal {
    site_name: String,
    site_description: String,
    #[serde(default)]
    site_url: Option<String>,
    #[serde(default)]
    author_name: Option<String>,
    #[serde(default)]
    author_title: Option<String>,
    #[serde(default)]
    social: Option<RawSocial>,
}

#[derive(Debug, Deserialize)]
struct RawSocial {
    #[serde(default)]
    github: Option<String>,
    #[serde(default)]
    linkedin: Option<String>,
    #[serde(default)]
    twitter: Option<String>,
    #[serde(default)]
    email: Option<String>,
}
