//! Dashboard backend for the dev portal: widget endpoints backed by the
//! GitLab fetch layer, a flat-file todo list, and bundled sample data for
//! unconfigured or failing upstreams.

pub mod api;
pub mod dotenv;
pub mod samples;
pub mod todos;

use crate::api::AppState;
use crate::todos::TodoStore;
use gitlab::{GitlabConfig, MrFetcher};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(thiserror::Error, Debug)]
pub enum PortalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("GitLab client setup failed: {0}")]
    Fetch(#[from] gitlab::FetchError),
}

/// Builds the shared services from the environment and serves the API until
/// the process is stopped.
pub async fn run_async(host: &str, port: u16) -> Result<(), PortalError> {
    let fetcher = MrFetcher::new(GitlabConfig::from_env())?;
    let state = AppState {
        fetcher: Arc::new(fetcher),
        todos: Arc::new(TodoStore::new("data")),
    };
    let app = api::router(state);

    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    tracing::info!("portal listening on {host}:{port}");
    axum::serve(listener, app).await?;
    Ok(())
}
