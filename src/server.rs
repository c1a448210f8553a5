use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tracing::{info, Instrument};

use crate::acquire::Acquirer;
use crate::config::AppConfig;
use crate::dispatch::{ApiResponse, RequestDispatcher};

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

/// Routes for both request styles, on `/` and `/api/render`.
pub fn router(dispatcher: Arc<RequestDispatcher>) -> Router {
    Router::new()
        .route("/", get(render_query).post(render_body))
        .route("/api/render", get(render_query).post(render_body))
        .route("/healthz", get(healthz))
        .with_state(dispatcher)
}

async fn render_query(
    State(dispatcher): State<Arc<RequestDispatcher>>,
    RawQuery(query): RawQuery,
) -> ApiResponse {
    let span = tracing::info_span!("request", request_id = %uuid::Uuid::new_v4(), style = "query");
    async move {
        let resp = dispatcher.handle_query(query.as_deref()).await;
        info!(status = resp.status.as_u16(), "Request complete");
        resp
    }
    .instrument(span)
    .await
}

async fn render_body(
    State(dispatcher): State<Arc<RequestDispatcher>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResponse {
    let span = tracing::info_span!("request", request_id = %uuid::Uuid::new_v4(), style = "body");
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    async move {
        let resp = dispatcher
            .handle_body(content_type.as_deref(), &body)
            .await;
        info!(status = resp.status.as_u16(), "Request complete");
        resp
    }
    .instrument(span)
    .await
}

async fn healthz() -> &'static str {
    "ok"
}

/// Dispatcher wired to the default clone-then-archive acquirer.
pub fn build_dispatcher(config: &AppConfig) -> Result<RequestDispatcher> {
    let acquirer =
        Acquirer::from_config(&config.acquire).context("Failed to build repository acquirer")?;
    Ok(RequestDispatcher::new(
        Arc::new(acquirer),
        config.render.default_max_bytes,
        config.dispatch.clone(),
    ))
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &AppConfig) -> Result<()> {
    let dispatcher = Arc::new(build_dispatcher(config)?);
    let app = router(dispatcher);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!(bind = %config.server.bind, "Listening for render requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
