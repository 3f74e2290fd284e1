use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{handlers, state::AppState};

pub fn create_router(state: AppState) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Define routes
    Router::new()
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/articles/:slug", get(handlers::get_article))
        .route("/api/categories", get(handlers::list_categories))
        .route("/api/site-config", get(handlers::site_config))
        .route("/api/search", get(handlers::search_articles))
        .route("/api/newsletter", post(handlers::subscribe_newsletter))
        .route("/api/contact", post(handlers::submit_contact))
        .route("/api/github-stars", get(handlers::github_stars))
        .route(
            "/api/revalidate",
            post(handlers::revalidate).get(handlers::revalidate_probe),
        )
        .route("/rss.xml", get(handlers::rss_feed))
        .route("/sitemap.xml", get(handlers::sitemap_xml))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
