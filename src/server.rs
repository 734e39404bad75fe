//! HTTP trigger for the email PDF service.
//!
//! Exposes the same entry point the serverless runtime calls:
//!
//! | Route | Method | Handler |
//! |-------|--------|---------|
//! | `/emails/{id}/pdf` | GET, POST | [`EmailPdfService::handle`] |
//! | `/health` | GET | liveness check |

use crate::error::EmailPdfError;
use crate::handler::{ApiRequest, ApiResponse, EmailPdfService};
use axum::extract::{Path, State};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, self.body).into_response();
        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            match (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "Dropping invalid response header"),
            }
        }
        response
    }
}

async fn render_pdf(
    State(service): State<Arc<EmailPdfService>>,
    Path(id): Path<String>,
) -> ApiResponse {
    service.handle(&ApiRequest::with_id(id)).await
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Router with CORS and request tracing applied.
pub fn router(service: Arc<EmailPdfService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/emails/{id}/pdf", get(render_pdf).post(render_pdf))
        .route("/health", get(health))
        .with_state(service)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve [`router`] on `addr` until Ctrl+C or SIGTERM.
pub async fn serve(addr: SocketAddr, service: Arc<EmailPdfService>) -> Result<(), EmailPdfError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| EmailPdfError::Internal(format!("cannot bind {addr}: {e}")))?;
    tracing::info!(addr = %addr, "Email PDF server listening");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| EmailPdfError::Internal(format!("server error: {e}")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutting down");
}
