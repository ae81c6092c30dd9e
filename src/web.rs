//! Health endpoint for Jellycord
//!
//! A small axum server exposing liveness routes for container
//! orchestration. Entirely optional; enabled via the `web` config
//! section.

use crate::error::Result;
use axum::routing::get;
use axum::Router;
use tokio::sync::watch;

async fn ping() -> &'static str {
    "Pong!"
}

async fn hello() -> &'static str {
    "Hello, World!"
}

async fn health() -> &'static str {
    "OK"
}

/// Build the health router
pub fn router() -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/hello", get(hello))
        .route("/health", get(health))
}

/// Serve the health routes until shutdown is signalled
///
/// # Arguments
///
/// * `bind` - Address to listen on (e.g. "0.0.0.0:8283")
/// * `shutdown` - Watch channel flipped to true on shutdown
///
/// # Errors
///
/// Returns error if the address cannot be bound
pub async fn serve(bind: &str, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Health endpoint listening on {}", bind);

    axum::serve(listener, router())
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_health_routes() {
        let router = router();

        for (path, expected) in [("/ping", "Pong!"), ("/hello", "Hello, World!"), ("/health", "OK")]
        {
            let response = router
                .clone()
                .oneshot(
                    axum::http::Request::builder()
                        .uri(path)
                        .body(axum::body::Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), axum::http::StatusCode::OK);
            let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
            assert_eq!(&body[..], expected.as_bytes());
        }
    }
}
