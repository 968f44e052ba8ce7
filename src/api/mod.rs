//! HTTP API over stored posts
//!
//! - `GET /api/v1/health`
//! - `GET /api/v1/getData?username=..&count=..` serves stored posts and
//!   crawls the profile on demand when nothing is stored yet

mod handlers;
mod service;

pub use handlers::{get_data, health, DataQuery};
pub use service::fetch_or_crawl;

use crate::config::Config;
use crate::crawler::Coordinator;
use crate::storage::{FileStore, PostStore};
use axum::routing::get;
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared state of every request handler
pub struct AppState {
    pub store: Arc<dyn PostStore>,
    pub coordinator: Coordinator,
    /// Directory for the per-request crawl output files
    pub scratch_dir: PathBuf,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PostStore>,
        coordinator: Coordinator,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            coordinator,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Builds the state described by a configuration
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        Ok(Self::new(
            Arc::new(FileStore::new(&config.store.path)),
            Coordinator::from_config(config)?,
            &config.store.scratch_dir,
        ))
    }
}

/// Builds the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/getData", get(get_data))
        .with_state(state)
}

/// Serves the API until the process is stopped
pub async fn serve(config: &Config) -> crate::Result<()> {
    let state = Arc::new(AppState::from_config(config)?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind.as_str()).await?;
    tracing::info!("HTTP server listening on {}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}
