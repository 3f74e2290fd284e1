use anyhow::Result;
use billet_backend::{config::AppConfig, routes, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;

    tracing::info!("Starting billet content server");
    tracing::info!("Content backend: {}", config.backend);
    tracing::info!("Site URL: {}", config.site_url);

    let addr = format!("{}:{}", config.bind_addr, config.port);
    let app_state = AppState::new(config)?;

    // Build router
    let app = routes::create_router(app_state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
