//! HTTP surface.
//!
//! | Route | Operation |
//! |-------|-----------|
//! | `GET /embedding/{word}` | Raw embedding of a word |
//! | `GET /neighbours/{word}` | Nearest neighbours of a word |
//! | `GET /distances/{word}` | Distances from a word to a word list |
//! | `GET /results` | Nearest neighbours of `sum(add) - sum(sub)` |
//! | `GET /vector` | The composite vector itself |
//! | `GET /health` | Store round-trip |
//!
//! Every route is mounted under `server.base_path` (default `/api`).

mod error;
mod handlers;
mod params;
mod request_id;

pub use error::ErrorBody;
pub use params::{QueryParams, WordPath};
pub use request_id::{REQUEST_ID_HEADER, RequestId};

use crate::config::ServerConfig;
use crate::services::WordService;
use crate::{Error, Result};
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::middleware;
use axum::routing::get;
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// The word operations.
    pub service: WordService,
}

impl AppState {
    /// Creates handler state.
    #[must_use]
    pub const fn new(service: WordService) -> Self {
        Self { service }
    }
}

/// Builds the application router.
///
/// # Errors
///
/// Returns an error if a configured CORS origin is not a valid header value.
pub fn router(state: AppState, server: &ServerConfig) -> Result<Router> {
    let routes = Router::new()
        .route("/embedding/{word}", get(handlers::embedding))
        .route("/neighbours/{word}", get(handlers::neighbours))
        .route("/distances/{word}", get(handlers::distances))
        .route("/results", get(handlers::results))
        .route("/vector", get(handlers::vector))
        .route("/health", get(handlers::health));

    let base = server.base_path.trim_end_matches('/');
    let app = if base.is_empty() {
        routes
    } else {
        Router::new().nest(base, routes)
    };

    Ok(app
        .fallback(handlers::not_found)
        .layer(middleware::from_fn(request_id::propagate))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(cors_layer(&server.cors_origins)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let values = origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|_| Error::InvalidInput(format!("invalid CORS origin '{origin}'")))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(values)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}

/// Serves `app` on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| Error::operation("local_addr", e))?;
    tracing::info!(%addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::operation("serve", e))
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
