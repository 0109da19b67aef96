use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scorecard::api::router;
use scorecard::catalog::{SqliteCatalog, load_courses_file};
use scorecard::config::AppConfig;
use scorecard::db;
use scorecard::persistence::SqliteGateway;
use scorecard::services::RoundTracker;
use scorecard::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "scorecard=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = db::connect(&config.database_url).await?;

    let catalog = Arc::new(SqliteCatalog::new(pool.clone()));
    if let Some(path) = &config.courses_file {
        let courses = load_courses_file(path)?;
        catalog.seed(courses).await?;
    }

    let gateway = Arc::new(SqliteGateway::new(pool.clone()));
    let tracker = RoundTracker::new(gateway.clone(), config.persist_timeout);

    let state = AppState {
        db: pool,
        catalog,
        gateway,
        tracker: Arc::new(Mutex::new(tracker)),
    };

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
