use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use billet_shared::{
    AdjacentArticles, Article, ArticleContent, ArticleLink, ArticleMetadata, Category, ImageRef,
    SiteConfig,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{feed, github, metadata, sitemap, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ArticleQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct StarsQuery {
    #[serde(default)]
    pub repo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProbeQuery {
    #[serde(default)]
    pub secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RevalidatePayload {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewsletterPayload {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ContactPayload {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Article as shown on list pages: no body, derived reading time included.
#[derive(Debug, Serialize)]
pub struct ArticleSummary {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub cover: Option<ImageRef>,
    pub categories: Vec<Category>,
    pub published_at: DateTime<Utc>,
    pub reading_time: u32,
}

impl From<&Article> for ArticleSummary {
    fn from(article: &Article) -> Self {
        ArticleSummary {
            slug: article.slug.clone(),
            title: article.title.clone(),
            description: article.description.clone(),
            cover: article.cover.clone(),
            categories: article.categories.clone(),
            published_at: article.published_at,
            reading_time: metadata::reading_time(
                article.content.as_str(),
                metadata::DEFAULT_WORDS_PER_MINUTE,
            ),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ArticleListResponse {
    pub articles: Vec<ArticleSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ArticleDetailResponse {
    pub article: Article,
    pub content_html: String,
    pub metadata: ArticleMetadata,
    pub previous: Option<ArticleLink>,
    pub next: Option<ArticleLink>,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub highlight: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total: usize,
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StarsResponse {
    pub stars: u64,
}

#[derive(Debug, Serialize)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    pub paths: Vec<String>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ArticleQuery>,
) -> Json<ArticleListResponse> {
    let mut articles = state.content().list_articles(query.limit).await;

    // Filter by category slug (case insensitive)
    if let Some(ref category) = query.category {
        articles.retain(|article| {
            article
                .categories
                .iter()
                .any(|c| c.slug.eq_ignore_ascii_case(category))
        });
    }

    let summaries: Vec<ArticleSummary> = articles.iter().map(ArticleSummary::from).collect();
    Json(ArticleListResponse {
        total: summaries.len(),
        articles: summaries,
    })
}

pub async fn get_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ArticleDetailResponse>, HandlerError> {
    let article = state
        .content()
        .get_article(&slug)
        .await
        .ok_or_else(not_found)?;

    let content_html = match &article.content {
        ArticleContent::Markdown(markdown) => metadata::markdown_to_html(markdown),
        ArticleContent::Html(html) => html.clone(),
    };
    let derived = ArticleMetadata {
        reading_time_minutes: metadata::reading_time(
            article.content.as_str(),
            metadata::DEFAULT_WORDS_PER_MINUTE,
        ),
        headings: metadata::extract_headings(&content_html),
    };

    let AdjacentArticles { previous, next } = state
        .content()
        .adjacent(article.published_at, &article.id)
        .await;

    Ok(Json(ArticleDetailResponse {
        content_html,
        metadata: derived,
        previous,
        next,
        article,
    }))
}

pub async fn list_categories(State(state): State<AppState>) -> Json<CategoriesResponse> {
    Json(CategoriesResponse {
        categories: state.content().list_categories().await,
    })
}

pub async fn site_config(State(state): State<AppState>) -> Json<SiteConfig> {
    Json(state.content().site_config().await)
}

pub async fn search_articles(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<SearchResponse> {
    let keyword = query.q.trim().to_string();
    let articles = state.content().search(&keyword).await;

    let results = articles
        .iter()
        .map(|article| SearchResult {
            slug: article.slug.clone(),
            title: article.title.clone(),
            description: article.description.clone(),
            published_at: article.published_at,
            highlight: extract_highlight(article.content.as_str(), &keyword),
        })
        .collect::<Vec<_>>();

    Json(SearchResponse {
        total: results.len(),
        results,
        query: query.q,
    })
}

pub async fn subscribe_newsletter(
    State(state): State<AppState>,
    Json(payload): Json<NewsletterPayload>,
) -> Result<Json<SubscriptionResponse>, HandlerError> {
    let email = payload.email.trim();
    if !is_valid_email(email) {
        return Err(bad_request("invalid email address"));
    }

    state
        .content()
        .subscribe_newsletter(email)
        .await
        .map_err(|e| internal_error("Failed to subscribe", e))?;

    Ok(Json(SubscriptionResponse {
        success: true,
        message: "Inscription réussie !".to_string(),
    }))
}

pub async fn submit_contact(
    State(state): State<AppState>,
    Json(payload): Json<ContactPayload>,
) -> Result<Json<SubscriptionResponse>, HandlerError> {
    let name = payload.name.trim();
    let email = payload.email.trim();
    let message = payload.message.trim();
    if name.is_empty() || message.is_empty() {
        return Err(bad_request("name and message are required"));
    }
    if !is_valid_email(email) {
        return Err(bad_request("invalid email address"));
    }

    state
        .content()
        .submit_contact(name, email, message)
        .await
        .map_err(|e| internal_error("Failed to send message", e))?;

    Ok(Json(SubscriptionResponse {
        success: true,
        message: "Message envoyé !".to_string(),
    }))
}

pub async fn github_stars(
    State(state): State<AppState>,
    Query(query): Query<StarsQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let repo = query
        .repo
        .as_deref()
        .map(str::trim)
        .filter(|repo| !repo.is_empty())
        .ok_or_else(|| bad_request("repository parameter is required"))?
        .to_string();

    if let Some(stars) = state.stars().get(&repo) {
        return Ok(stars_response(stars));
    }

    match github::fetch_star_count(
        state.http(),
        &state.config().github_api_url,
        &repo,
        state.config().github_token.as_deref(),
    )
    .await
    {
        Ok(stars) => {
            state.stars().insert(repo, stars);
            Ok(stars_response(stars))
        }
        Err(err) => match state.stars().get_stale(&repo) {
            Some(stale) => {
                tracing::warn!("github stars fetch failed for {repo}, serving stale value: {err}");
                Ok(stars_response(stale))
            }
            None => Err(internal_error("Failed to fetch stars", err)),
        },
    }
}

/// Authenticated cache-invalidation webhook, called by the CMS on publish.
pub async fn revalidate(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Option<Json<RevalidatePayload>>,
) -> Result<Json<RevalidateResponse>, HandlerError> {
    let provided = headers
        .get("x-revalidate-secret")
        .and_then(|value| value.to_str().ok());
    if !secret_matches(state.config().revalidate_secret.as_deref(), provided) {
        tracing::warn!("revalidation rejected: invalid or missing token");
        return Err(unauthorized("invalid or missing token"));
    }

    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    if let Some(kind) = payload.kind.as_deref() {
        tracing::info!("revalidation requested for {kind}");
    }

    let mut paths = vec!["/".to_string(), "/blog".to_string()];
    state.content().invalidate_lists();
    if let Some(slug) = payload
        .slug
        .as_deref()
        .map(str::trim)
        .filter(|slug| !slug.is_empty())
    {
        state.content().invalidate_article(slug);
        paths.push(format!("/blog/{slug}"));
    }
    for path in &paths {
        tracing::info!("revalidated path {path}");
    }

    Ok(Json(RevalidateResponse {
        revalidated: true,
        paths,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

/// Manual-test variant of the webhook, only served in development.
pub async fn revalidate_probe(
    State(state): State<AppState>,
    Query(query): Query<ProbeQuery>,
) -> Result<Json<RevalidateResponse>, HandlerError> {
    if !state.config().is_development() {
        return Err(forbidden("probe disabled outside development"));
    }
    if !secret_matches(
        state.config().revalidate_secret.as_deref(),
        query.secret.as_deref(),
    ) {
        return Err(unauthorized("invalid token"));
    }

    state.content().invalidate_lists();
    Ok(Json(RevalidateResponse {
        revalidated: true,
        paths: vec!["/".to_string(), "/blog".to_string()],
        timestamp: Utc::now().to_rfc3339(),
    }))
}

pub async fn rss_feed(State(state): State<AppState>) -> impl IntoResponse {
    // Fetch the list and the channel metadata in parallel; both degrade on
    // their own.
    let (articles, site) = tokio::join!(
        state.content().list_articles(Some(feed::FEED_ARTICLE_LIMIT)),
        state.content().site_config(),
    );
    let channel = feed::build_channel(&site, &articles, &state.config().site_url);

    (
        [
            (header::CONTENT_TYPE, "application/xml; charset=utf-8"),
            (header::CACHE_CONTROL, "s-maxage=3600, stale-while-revalidate"),
        ],
        channel.to_string(),
    )
}

pub async fn sitemap_xml(State(state): State<AppState>) -> impl IntoResponse {
    let articles = state.content().list_articles(None).await;
    let entries = sitemap::build_entries(&state.config().site_url, &articles);

    (
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        sitemap::to_xml(&entries),
    )
}

fn stars_response(stars: u64) -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "public, s-maxage=3600, stale-while-revalidate=86400")],
        Json(StarsResponse { stars }),
    )
}

fn secret_matches(expected: Option<&str>, provided: Option<&str>) -> bool {
    match (expected, provided) {
        (Some(expected), Some(provided)) => expected == provided,
        _ => false,
    }
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

/// Extract a snippet around the keyword with the match wrapped in `<mark>`.
fn extract_highlight(text: &str, keyword: &str) -> String {
    let text_lower = text.to_lowercase();
    let keyword_lower = keyword.to_lowercase();

    // Lowercasing may shift byte offsets in unusual scripts; only trust the
    // position when it lands on char boundaries of the original text.
    let position = if keyword_lower.is_empty() {
        None
    } else {
        text_lower.find(&keyword_lower).filter(|&p| {
            p + keyword.len() <= text.len()
                && text.is_char_boundary(p)
                && text.is_char_boundary(p + keyword.len())
        })
    };

    let Some(position) = position else {
        return prefix_snippet(text, 100);
    };

    let start = floor_boundary(text, position.saturating_sub(40));
    let end = ceil_boundary(text, (position + keyword.len() + 40).min(text.len()));

    let mut snippet = String::new();
    if start > 0 {
        snippet.push_str("...");
    }
    snippet.push_str(&text[start..position]);
    snippet.push_str("<mark>");
    snippet.push_str(&text[position..position + keyword.len()]);
    snippet.push_str("</mark>");
    snippet.push_str(&text[position + keyword.len()..end]);
    if end < text.len() {
        snippet.push_str("...");
    }
    snippet
}

fn prefix_snippet(text: &str, max_chars: usize) -> String {
    let mut snippet: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        snippet.push_str("...");
    }
    snippet
}

fn floor_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

fn internal_error(message: &str, err: impl std::fmt::Display) -> HandlerError {
    tracing::error!("{}: {}", message, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.to_string(),
            code: 500,
        }),
    )
}

fn bad_request(message: &str) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
            code: 400,
        }),
    )
}

fn unauthorized(message: &str) -> HandlerError {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
            code: 401,
        }),
    )
}

fn forbidden(message: &str) -> HandlerError {
    (
        StatusCode::FORBIDDEN,
        Json(ErrorResponse {
            error: message.to_string(),
            code: 403,
        }),
    )
}

fn not_found() -> HandlerError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Article not found".to_string(),
            code: 404,
        }),
    )
}
