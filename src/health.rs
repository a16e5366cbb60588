//! Liveness endpoint for hosting platforms that expect an open HTTP port.

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::info;

pub const STATUS_TEXT: &str = "🤖 Savvy Chatbot is running!";

pub fn router() -> Router {
    Router::new().route("/", get(|| async { STATUS_TEXT }))
}

/// Serve the health router on an already-bound listener until the task is dropped.
pub async fn serve(listener: TcpListener) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Health endpoint listening on {addr}");
    }
    axum::serve(listener, router()).await
}
