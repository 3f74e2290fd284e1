//! GitHub star-count proxy support.
//!
//! The handler keeps results in an injected [`crate::cache::TtlCache`] for
//! an hour and falls back to the stale value when the upstream call fails.

use reqwest::header;
use serde::Deserialize;

use crate::content::{read_json, ContentError};

#[derive(Debug, Deserialize)]
struct RepoResponse {
    #[serde(default)]
    stargazers_count: u64,
}

/// Fetch the current star count of `owner/name` from the GitHub API.
/// An optional token raises the rate limit.
pub async fn fetch_star_count(
    client: &reqwest::Client,
    api_base: &str,
    repo: &str,
    token: Option<&str>,
) -> Result<u64, ContentError> {
    let url = format!("{}/repos/{}", api_base.trim_end_matches('/'), repo);
    let mut request = client
        .get(&url)
        .header(header::ACCEPT, "application/vnd.github.v3+json");
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await?;
    let repo: RepoResponse = read_json(response).await?;
    Ok(repo.stargazers_count)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn reads_the_stargazer_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/FabLrc/billet"))
            .and(header("accept", "application/vnd.github.v3+json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "stargazers_count": 128 })),
            )
            .mount(&server)
            .await;

        let stars = fetch_star_count(&reqwest::Client::new(), &server.uri(), "FabLrc/billet", None)
            .await
            .expect("ok");
        assert_eq!(stars, 128);
    }

    #[tokio::test]
    async fn sends_the_token_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/FabLrc/billet"))
            .and(header("authorization", "Bearer s3cret"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "stargazers_count": 1 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let stars = fetch_star_count(
            &reqwest::Client::new(),
            &server.uri(),
            "FabLrc/billet",
            Some("s3cret"),
        )
        .await
        .expect("ok");
        assert_eq!(stars, 1);
    }

    #[tokio::test]
    async fn upstream_failures_surface_as_status_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/FabLrc/billet"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let error = fetch_star_count(&reqwest::Client::new(), &server.uri(), "FabLrc/billet", None)
            .await
            .expect_err("should fail");
        assert!(matches!(error, ContentError::Status(_)));
    }
}
