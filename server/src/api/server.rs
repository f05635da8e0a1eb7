//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Json;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;

use super::openapi::openapi_json;
use super::routes::health::{self, HealthState};
use super::routes::traces::{self, IngestState};
use super::routes::{QueryState, pipelines, trending};
use crate::core::CoreApp;
use crate::core::constants::{DEFAULT_BODY_LIMIT, HTTP_REQUEST_TIMEOUT_SECS, OTLP_BODY_LIMIT};

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app } = self;

        // Clone shutdown before moving app state into the router
        let shutdown = app.shutdown.clone();

        let host = app.config.server.host.clone();
        let port = app.config.server.port;
        let addr = SocketAddr::new(host.parse()?, port);

        let ingest_routes = Router::new()
            .route("/traces", post(traces::export))
            .with_state(IngestState {
                buffer: Arc::clone(&app.buffer),
            })
            .layer(DefaultBodyLimit::max(OTLP_BODY_LIMIT));

        let query_routes = Router::new()
            .route("/pipelines", get(pipelines::list_pipelines))
            .route(
                "/pipelines/{pipeline_id}/cost",
                get(pipelines::get_pipeline_cost),
            )
            .route("/cost/trending", get(trending::get_cost_trending))
            .with_state(QueryState {
                pool: app.database.pool().clone(),
            });

        let health_routes = Router::new()
            .route("/health", get(health::health))
            .with_state(HealthState {
                buffer: Arc::clone(&app.buffer),
                writer: Arc::clone(&app.writer_status),
            });

        let router = Router::new()
            .nest(
                "/v1",
                ingest_routes.merge(query_routes).merge(health_routes),
            )
            .route("/v1/openapi.json", get(openapi_json))
            .fallback(handle_404)
            .layer(CompressionLayer::new())
            .layer(TimeoutLayer::new(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS)))
            .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT));

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        Ok(app)
    }
}

async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "not_found",
            "code": "UNKNOWN_ROUTE",
            "message": "No such endpoint"
        })),
    )
}
