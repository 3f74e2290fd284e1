//! Debounced search driver.
//!
//! Models the interactive search box: keystrokes arrive one by one, each
//! one cancelling the pending quiet-period timer; only once input has been
//! quiet for the debounce window is a query issued. Every issued request
//! carries a monotonically increasing sequence number and a response is
//! delivered only while its number is still the latest, so a slow in-flight
//! response can never clobber the results of a newer query.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use billet_shared::Article;
use tokio::sync::mpsc;

use crate::content::ContentService;

/// Quiet period before a keystroke burst turns into a query.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// One delivered search outcome.
#[derive(Debug)]
pub struct SearchUpdate {
    pub query: String,
    pub results: Vec<Article>,
}

/// Handle on a running debounced-search task.
///
/// Dropping the session closes the keystroke channel and winds the task
/// down.
pub struct SearchSession {
    keystrokes: mpsc::Sender<String>,
    updates: mpsc::Receiver<SearchUpdate>,
}

impl SearchSession {
    pub fn spawn(service: Arc<ContentService>, debounce: Duration) -> Self {
        let (keystrokes, input) = mpsc::channel(32);
        let (output, updates) = mpsc::channel(32);
        tokio::spawn(run(service, debounce, input, output));
        SearchSession {
            keystrokes,
            updates,
        }
    }

    /// Feed the current state of the input box. Returns false once the
    /// session task has stopped.
    pub async fn type_query(&self, query: impl Into<String>) -> bool {
        self.keystrokes.send(query.into()).await.is_ok()
    }

    /// Next delivered result set, in issue order, stale responses already
    /// filtered out.
    pub async fn next_update(&mut self) -> Option<SearchUpdate> {
        self.updates.recv().await
    }
}

async fn run(
    service: Arc<ContentService>,
    debounce: Duration,
    mut input: mpsc::Receiver<String>,
    output: mpsc::Sender<SearchUpdate>,
) {
    let latest = Arc::new(AtomicU64::new(0));
    let mut seq: u64 = 0;
    let mut pending: Option<String> = None;

    loop {
        let timer = tokio::time::sleep(debounce);
        tokio::pin!(timer);

        tokio::select! {
            keystroke = input.recv() => match keystroke {
                // restarts the loop, and with it the quiet-period timer
                Some(query) => pending = Some(query),
                None => break,
            },
            () = &mut timer, if pending.is_some() => {
                let Some(query) = pending.take() else { continue };
                seq += 1;
                latest.store(seq, Ordering::SeqCst);

                if query.trim().is_empty() {
                    if output
                        .send(SearchUpdate { query, results: Vec::new() })
                        .await
                        .is_err()
                    {
                        break;
                    }
                    continue;
                }

                let service = Arc::clone(&service);
                let latest = Arc::clone(&latest);
                let output = output.clone();
                let request_seq = seq;
                tokio::spawn(async move {
                    let results = service.search(&query).await;
                    // a newer query superseded this one while it was in flight
                    if latest.load(Ordering::SeqCst) == request_seq {
                        let _ = output.send(SearchUpdate { query, results }).await;
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use billet_shared::{
        AdjacentArticles, ArticleContent, Category, SiteConfig,
    };
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::content::{ContentError, ContentSource};

    struct SlowFirstSource {
        searches: Arc<AtomicUsize>,
        slow_query: Option<String>,
    }

    #[async_trait]
    impl ContentSource for SlowFirstSource {
        async fn list_articles(&self, _limit: Option<usize>) -> Result<Vec<Article>, ContentError> {
            Ok(vec![])
        }

        async fn get_article_by_slug(
            &self,
            _slug: &str,
        ) -> Result<Option<Article>, ContentError> {
            Ok(None)
        }

        async fn list_categories(&self) -> Result<Vec<Category>, ContentError> {
            Ok(vec![])
        }

        async fn get_site_config(&self) -> Result<SiteConfig, ContentError> {
            Ok(SiteConfig::default())
        }

        async fn search_articles(&self, query: &str) -> Result<Vec<Article>, ContentError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            if self.slow_query.as_deref() == Some(query) {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            Ok(vec![Article {
                id: query.to_string(),
                slug: query.to_string(),
                title: query.to_string(),
                description: String::new(),
                content: ArticleContent::Markdown(String::new()),
                cover: None,
                author: None,
                categories: vec![],
                published_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
            }])
        }

        async fn adjacent_articles(
            &self,
            _published_at: DateTime<Utc>,
            _id: &str,
        ) -> Result<AdjacentArticles, ContentError> {
            Ok(AdjacentArticles::default())
        }

        async fn subscribe_newsletter(&self, _email: &str) -> Result<(), ContentError> {
            Ok(())
        }

        async fn submit_contact(
            &self,
            _name: &str,
            _email: &str,
            _message: &str,
        ) -> Result<(), ContentError> {
            Ok(())
        }
    }

    fn session_with(
        slow_query: Option<&str>,
    ) -> (SearchSession, Arc<AtomicUsize>) {
        let searches = Arc::new(AtomicUsize::new(0));
        let source = SlowFirstSource {
            searches: Arc::clone(&searches),
            slow_query: slow_query.map(str::to_string),
        };
        let service = Arc::new(ContentService::new(Box::new(source)));
        (SearchSession::spawn(service, SEARCH_DEBOUNCE), searches)
    }

    #[tokio::test(start_paused = true)]
    async fn a_keystroke_burst_issues_exactly_one_query() {
        let (mut session, searches) = session_with(None);

        for partial in ["r", "ru", "rust"] {
            assert!(session.type_query(partial).await);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        tokio::time::sleep(Duration::from_millis(400)).await;

        let update = session.next_update().await.expect("one update");
        assert_eq!(update.query, "rust");
        assert_eq!(update.results.len(), 1);
        assert_eq!(searches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_queries_deliver_empty_results_without_searching() {
        let (mut session, searches) = session_with(None);

        assert!(session.type_query("   ").await);
        tokio::time::sleep(Duration::from_millis(400)).await;

        let update = session.next_update().await.expect("one update");
        assert!(update.results.is_empty());
        assert_eq!(searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn a_stale_response_is_discarded() {
        let (mut session, searches) = session_with(Some("a"));

        assert!(session.type_query("a").await);
        // let the first query fire and start its slow fetch
        tokio::time::sleep(Duration::from_millis(310)).await;
        assert!(session.type_query("ab").await);
        tokio::time::sleep(Duration::from_millis(310)).await;

        let update = session.next_update().await.expect("newest update");
        assert_eq!(update.query, "ab");

        // the slow response for "a" finishes afterwards and must be dropped
        let nothing =
            tokio::time::timeout(Duration::from_secs(2), session.next_update()).await;
        assert!(nothing.is_err());
        assert_eq!(searches.load(Ordering::SeqCst), 2);
    }
}
