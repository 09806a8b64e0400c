use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tracing::info;

pub const BANNER: &str = "News dispatcher is running";

/// Liveness routes. Shares no state with the dispatch loop.
pub fn router() -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
}

async fn banner() -> Json<&'static str> {
    Json(BANNER)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

pub async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Health endpoint listening on {addr}");
    axum::serve(listener, router()).await?;
    Ok(())
}
