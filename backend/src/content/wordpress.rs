//! WordPress GraphQL client (WPGraphQL schema).
//!
//! All operations POST `{ query, variables }` to one endpoint. WordPress
//! delivers rendered HTML bodies, so articles map to
//! [`ArticleContent::Html`].

use async_trait::async_trait;
use billet_shared::{
    AdjacentArticles, Article, ArticleContent, ArticleLink, Author, Category, ImageRef,
    SiteConfig,
};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{de::DeserializeOwned, Deserialize};
use url::Url;

use super::{read_json, ContentError, ContentSource, SEARCH_RESULT_LIMIT};

/// Upper bound used when the caller asks for "everything"; mirrors the
/// corpus size a personal blog realistically reaches.
const FULL_LIST_LIMIT: usize = 1000;

const POST_FIELDS: &str = "\
    id\n    databaseId\n    title\n    slug\n    date\n    content\n    excerpt\n\
    featuredImage { node { sourceUrl altText } }\n\
    author { node { name avatar { url } } }\n\
    categories { nodes { databaseId name slug } }";

pub struct WordPressSource {
    endpoint: Url,
    client: reqwest::Client,
}

impl WordPressSource {
    pub fn new(endpoint: &str, client: reqwest::Client) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| anyhow::anyhow!("invalid WORDPRESS_API_URL {endpoint:?}: {e}"))?;
        Ok(WordPressSource { endpoint, client })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: String,
        variables: serde_json::Value,
    ) -> Result<T, ContentError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&serde_json::json!({ "query": query, "variables": variables }))
            .send()
            .await?;
        let payload: GraphQlResponse<T> = read_json(response).await?;
        if let Some(error) = payload.errors.into_iter().flatten().next() {
            return Err(ContentError::Decode(format!("graphql: {}", error.message)));
        }
        payload
            .data
            .ok_or_else(|| ContentError::Decode("graphql response missing data".to_string()))
    }

    async fn fetch_posts(&self, limit: usize) -> Result<Vec<Article>, ContentError> {
        let query = format!(
            "query ListPosts($limit: Int!) {{\n\
             posts(first: $limit, where: {{ orderby: {{ field: DATE, order: DESC }} }}) {{\n\
             nodes {{\n{POST_FIELDS}\n}} }} }}"
        );
        let data: PostsData = self
            .execute(query, serde_json::json!({ "limit": limit }))
            .await?;
        data.posts.nodes.into_iter().map(map_post).collect()
    }
}

#[async_trait]
impl ContentSource for WordPressSource {
    async fn list_articles(&self, limit: Option<usize>) -> Result<Vec<Article>, ContentError> {
        self.fetch_posts(limit.unwrap_or(FULL_LIST_LIMIT)).await
    }

    async fn get_article_by_slug(&self, slug: &str) -> Result<Option<Article>, ContentError> {
        let query = format!(
            "query PostBySlug($slug: ID!) {{\n\
             post(id: $slug, idType: SLUG) {{\n{POST_FIELDS}\n}} }}"
        );
        let data: PostData = self
            .execute(query, serde_json::json!({ "slug": slug }))
            .await?;
        data.post.map(map_post).transpose()
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ContentError> {
        let query = "query ListCategories {\n\
                     categories(first: 100) { nodes { id databaseId name slug } } }"
            .to_string();
        let data: CategoriesData = self.execute(query, serde_json::json!({})).await?;
        Ok(data
            .categories
            .nodes
            .into_iter()
            .map(|node| Category {
                id: node
                    .database_id
                    .map(|n| n.to_string())
                    .or(node.id)
                    .unwrap_or_else(|| node.slug.clone()),
                slug: node.slug,
                name: node.name,
            })
            .collect())
    }

    async fn get_site_config(&self) -> Result<SiteConfig, ContentError> {
        let query = "query GeneralSettings {\n\
                     generalSettings { title description url } }"
            .to_string();
        let data: SettingsData = self.execute(query, serde_json::json!({})).await?;
        let settings = data.general_settings;
        let defaults = SiteConfig::default();
        Ok(SiteConfig {
            site_name: settings.title.unwrap_or(defaults.site_name),
            site_description: settings.description.unwrap_or(defaults.site_description),
            site_url: settings.url.unwrap_or(defaults.site_url),
            author_name: defaults.author_name,
            author_title: defaults.author_title,
            social: defaults.social,
        })
    }

    async fn search_articles(&self, query: &str) -> Result<Vec<Article>, ContentError> {
        let gql = format!(
            "query SearchPosts($search: String!, $limit: Int!) {{\n\
             posts(first: $limit, where: {{ search: $search }}) {{\n\
             nodes {{\n{POST_FIELDS}\n}} }} }}"
        );
        let data: PostsData = self
            .execute(
                gql,
                serde_json::json!({ "search": query, "limit": SEARCH_RESULT_LIMIT }),
            )
            .await?;
        let mut articles: Vec<Article> = data
            .posts
            .nodes
            .into_iter()
            .map(map_post)
            .collect::<Result<_, _>>()?;
        // WPGraphQL orders search hits by relevance; recency wins here.
        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at).then(b.id.cmp(&a.id)));
        articles.truncate(SEARCH_RESULT_LIMIT);
        Ok(articles)
    }

    async fn adjacent_articles(
        &self,
        _published_at: DateTime<Utc>,
        id: &str,
    ) -> Result<AdjacentArticles, ContentError> {
        // One sorted fetch plus a linear scan; the corpus of a personal blog
        // is small enough that two range queries are not worth a second
        // round trip against this schema.
        let query = "query AllPostsSorted($limit: Int!) {\n\
                     posts(first: $limit, where: { orderby: { field: DATE, order: DESC } }) {\n\
                     nodes { databaseId slug title date } } }"
            .to_string();
        let data: SortedPostsData = self
            .execute(query, serde_json::json!({ "limit": FULL_LIST_LIMIT }))
            .await?;

        let mut posts = Vec::with_capacity(data.posts.nodes.len());
        for node in data.posts.nodes {
            let date = parse_post_date(&node.date)?;
            posts.push((node.database_id, node.slug, node.title, date));
        }
        // Re-sorted locally so identical timestamps resolve deterministically
        // by id.
        posts.sort_by(|a, b| b.3.cmp(&a.3).then(b.0.cmp(&a.0)));

        let Some(index) = posts.iter().position(|post| post.0.to_string() == id) else {
            return Ok(AdjacentArticles::default());
        };

        // Newest first: the previous (older) article sits after the current
        // index, the next (newer) one before it.
        let link = |post: &(u64, String, String, DateTime<Utc>)| ArticleLink {
            slug: post.1.clone(),
            title: post.2.clone(),
        };
        Ok(AdjacentArticles {
            previous: posts.get(index + 1).map(link),
            next: index.checked_sub(1).and_then(|i| posts.get(i)).map(link),
        })
    }

    async fn subscribe_newsletter(&self, email: &str) -> Result<(), ContentError> {
        // No newsletter plumbing on this backend yet; accept and log, the
        // way the reference deployment stubs it.
        tracing::info!("newsletter subscription accepted for {email} (stub transport)");
        Ok(())
    }

    async fn submit_contact(
        &self,
        name: &str,
        email: &str,
        _message: &str,
    ) -> Result<(), ContentError> {
        tracing::info!("contact message accepted from {name} <{email}> (stub transport)");
        Ok(())
    }
}

fn map_post(node: PostNode) -> Result<Article, ContentError> {
    let published_at = parse_post_date(&node.date)?;
    Ok(Article {
        id: node.database_id.to_string(),
        slug: node.slug,
        title: node.title,
        description: node.excerpt.unwrap_or_default(),
        content: ArticleContent::Html(node.content.unwrap_or_default()),
        cover: node.featured_image.map(|wrap| ImageRef {
            url: wrap.node.source_url,
            alt: wrap.node.alt_text,
        }),
        author: node.author.map(|wrap| Author {
            name: wrap.node.name,
            avatar: wrap.node.avatar.map(|avatar| ImageRef {
                url: avatar.url,
                alt: None,
            }),
            bio: None,
        }),
        categories: node
            .categories
            .map(|nodes| {
                nodes
                    .nodes
                    .into_iter()
                    .map(|category| Category {
                        id: category
                            .database_id
                            .map(|n| n.to_string())
                            .unwrap_or_else(|| category.slug.clone()),
                        slug: category.slug,
                        name: category.name,
                    })
                    .collect()
            })
            .unwrap_or_default(),
        published_at,
    })
}

/// WordPress emits site-local naive datetimes; anything unparseable is a
/// malformed response, not a transport problem.
fn parse_post_date(raw: &str) -> Result<DateTime<Utc>, ContentError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| ContentError::Decode(format!("invalid post date {raw:?}: {e}")))
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct GraphQlResponse<T> {
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct PostsData {
    posts: Nodes<PostNode>,
}

#[derive(Debug, Deserialize)]
struct PostData {
    post: Option<PostNode>,
}

#[derive(Debug, Deserialize)]
struct SortedPostsData {
    posts: Nodes<SortedPostNode>,
}

#[derive(Debug, Deserialize)]
struct CategoriesData {
    categories: Nodes<CategoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsData {
    general_settings: SettingsNode,
}

#[derive(Debug, Deserialize)]
struct Nodes<T> {
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct NodeWrap<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostNode {
    database_id: u64,
    title: String,
    slug: String,
    date: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    featured_image: Option<NodeWrap<MediaNode>>,
    #[serde(default)]
    author: Option<NodeWrap<AuthorNode>>,
    #[serde(default)]
    categories: Option<Nodes<CategoryNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SortedPostNode {
    database_id: u64,
    slug: String,
    title: String,
    date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaNode {
    source_url: String,
    #[serde(default)]
    alt_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorNode {
    name: String,
    #[serde(default)]
    avatar: Option<AvatarNode>,
}

#[derive(Debug, Deserialize)]
struct AvatarNode {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryNode {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    database_id: Option<u64>,
    name: String,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct SettingsNode {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer) -> WordPressSource {
        WordPressSource::new(&format!("{}/graphql", server.uri()), reqwest::Client::new())
            .expect("valid endpoint")
    }

    fn post_json(database_id: u64, slug: &str, title: &str, date: &str) -> serde_json::Value {
        json!({
            "id": format!("cG9zdDo{database_id}"),
            "databaseId": database_id,
            "title": title,
            "slug": slug,
            "date": date,
            "content": "<h2>Section</h2><p>corps</p>",
            "excerpt": "<p>résumé</p>",
            "featuredImage": { "node": { "sourceUrl": "https://cdn.example.com/a.jpg", "altText": "img" } },
            "author": { "node": { "name": "Fabien", "avatar": { "url": "https://cdn.example.com/f.png" } } },
            "categories": { "nodes": [ { "databaseId": 3, "name": "Web", "slug": "web" } ] }
        })
    }

    #[tokio::test]
    async fn list_articles_maps_posts_including_naive_dates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "posts": { "nodes": [
                    post_json(11, "hello", "Hello", "2024-03-10T09:30:00")
                ] } }
            })))
            .mount(&server)
            .await;

        let articles = source(&server).list_articles(Some(10)).await.expect("ok");
        assert_eq!(articles.len(), 1);
        let article = &articles[0];
        assert_eq!(article.id, "11");
        assert_eq!(
            article.published_at,
            Utc.with_ymd_and_hms(2024, 3, 10, 9, 30, 0).unwrap()
        );
        assert!(matches!(article.content, ArticleContent::Html(_)));
        assert_eq!(article.categories[0].name, "Web");
    }

    #[tokio::test]
    async fn missing_post_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_partial_json(json!({ "variables": { "slug": "absent" } })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "post": null } })),
            )
            .mount(&server)
            .await;

        let found = source(&server)
            .get_article_by_slug("absent")
            .await
            .expect("ok");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn graphql_errors_map_to_decode_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [ { "message": "Internal server error" } ]
            })))
            .mount(&server)
            .await;

        let error = source(&server)
            .list_articles(None)
            .await
            .expect_err("should fail");
        assert!(matches!(error, ContentError::Decode(_)));
    }

    #[tokio::test]
    async fn adjacent_articles_resolve_chronological_neighbors() {
        let server = MockServer::start().await;
        // Newest first, as the backend would answer.
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "posts": { "nodes": [
                    { "databaseId": 3, "slug": "troisieme", "title": "Troisième", "date": "2024-03-03T00:00:00" },
                    { "databaseId": 2, "slug": "deuxieme", "title": "Deuxième", "date": "2024-02-02T00:00:00" },
                    { "databaseId": 1, "slug": "premier", "title": "Premier", "date": "2024-01-01T00:00:00" }
                ] } }
            })))
            .mount(&server)
            .await;

        let wordpress = source(&server);
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap();

        let around_first = wordpress.adjacent_articles(t1, "1").await.expect("ok");
        assert!(around_first.previous.is_none());
        assert_eq!(
            around_first.next.map(|l| l.slug),
            Some("deuxieme".to_string())
        );

        let around_second = wordpress.adjacent_articles(t2, "2").await.expect("ok");
        assert_eq!(
            around_second.previous.map(|l| l.slug),
            Some("premier".to_string())
        );
        assert_eq!(
            around_second.next.map(|l| l.slug),
            Some("troisieme".to_string())
        );
    }

    #[tokio::test]
    async fn adjacent_ties_resolve_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "posts": { "nodes": [
                    { "databaseId": 9, "slug": "neuf", "title": "Neuf", "date": "2024-06-01T12:00:00" },
                    { "databaseId": 8, "slug": "huit", "title": "Huit", "date": "2024-06-01T12:00:00" }
                ] } }
            })))
            .mount(&server)
            .await;

        let when = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let around_eight = source(&server).adjacent_articles(when, "8").await.expect("ok");
        // Same timestamp: the higher id sorts newer.
        assert_eq!(around_eight.next.map(|l| l.slug), Some("neuf".to_string()));
        assert!(around_eight.previous.is_none());
    }

    #[tokio::test]
    async fn search_sorts_by_recency_before_capping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "posts": { "nodes": [
                    post_json(1, "ancien", "Ancien", "2023-01-01T00:00:00"),
                    post_json(2, "recent", "Récent", "2024-01-01T00:00:00")
                ] } }
            })))
            .mount(&server)
            .await;

        let results = source(&server).search_articles("corps").await.expect("ok");
        assert_eq!(results[0].slug, "recent");
        assert_eq!(results[1].slug, "ancien");
    }

    #[tokio::test]
    async fn site_config_falls_back_to_defaults_for_missing_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "generalSettings": { "title": "Carnet", "description": null, "url": null } }
            })))
            .mount(&server)
            .await;

        let config = source(&server).get_site_config().await.expect("ok");
        assert_eq!(config.site_name, "Carnet");
        assert_eq!(config.site_description, "Blog personnel");
    }
}
