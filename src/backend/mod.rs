mod auth;
mod error;
mod handlers;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use sqlx::{Pool, Sqlite};
use tower_http::trace::TraceLayer;

use crate::identity::IdentityVerifier;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Sqlite>,
    pub verifier: Arc<IdentityVerifier>,
}

impl AppState {
    pub fn new(db: Pool<Sqlite>, verifier: IdentityVerifier) -> Self {
        Self {
            db,
            verifier: Arc::new(verifier),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "Backend is running" }))
        .merge(routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
