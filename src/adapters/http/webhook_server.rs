//! Webhook ingress server: only the route needed to hand a parsed payload
//! to `Connector::handle_webhook` is implemented, not a general REST
//! surface (`Router`/`State`, `TcpListener::bind` +
//! `axum::serve(...).with_graceful_shutdown(...)`, conditional
//! `CorsLayer`/`TraceLayer`).
//!
//! Responses are 2xx on accepted, even when the normalizer dropped the
//! payload; 4xx only for malformed syntax or an unknown connector id.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::domain::errors::ConnectorError;
use crate::domain::models::RequestContext;
use crate::domain::ports::WebhookConnector;
use crate::services::alert_manager::AlertManager;

#[derive(Debug, Clone)]
pub struct WebhookServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct AcceptedResponse {
    accepted: bool,
}

struct AppState {
    connectors: HashMap<i64, Arc<dyn WebhookConnector>>,
    alert_manager: Arc<AlertManager>,
}

pub struct WebhookServer {
    config: WebhookServerConfig,
    connectors: HashMap<i64, Arc<dyn WebhookConnector>>,
    alert_manager: Arc<AlertManager>,
}

impl WebhookServer {
    pub fn new(
        config: WebhookServerConfig,
        connectors: HashMap<i64, Arc<dyn WebhookConnector>>,
        alert_manager: Arc<AlertManager>,
    ) -> Self {
        Self {
            config,
            connectors,
            alert_manager,
        }
    }

    fn build_router(self) -> Router {
        let state = Arc::new(AppState {
            connectors: self.connectors,
            alert_manager: self.alert_manager,
        });

        Router::new()
            .route("/webhooks/{connector_id}", post(handle_webhook))
            .route("/health", axum::routing::get(health_check))
            .with_state(state)
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
            .layer(TraceLayer::new_for_http())
    }

    /// Binds and serves until `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let router = self.build_router();

        tracing::info!(%addr, "webhook ingress server listening");

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}

async fn health_check() -> &'static str {
    "OK"
}

async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    Path(connector_id): Path<i64>,
    body: axum::body::Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(connector) = state.connectors.get(&connector_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::to_value(ErrorResponse {
                error: format!("unknown connector id: {connector_id}"),
            })
            .unwrap_or(serde_json::Value::Null)),
        );
    };

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::to_value(ErrorResponse {
                    error: format!("malformed JSON payload: {err}"),
                })
                .unwrap_or(serde_json::Value::Null)),
            );
        }
    };

    match connector.handle_webhook(payload).await {
        Ok(Some(alert)) => {
            let ctx = RequestContext::system(format!("webhook:{connector_id}"));
            if let Err(err) = state.alert_manager.process_alert(alert, &ctx).await {
                tracing::error!(connector_id, error = %err, "failed to process webhook alert");
            }
            accepted()
        }
        Ok(None) => accepted(),
        Err(ConnectorError::Validation(err)) => {
            tracing::warn!(connector_id, error = %err, "webhook payload dropped by normalizer");
            accepted()
        }
        Err(err) => {
            tracing::error!(connector_id, error = %err, "webhook connector failed to handle payload");
            accepted()
        }
    }
}

fn accepted() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::ACCEPTED,
        Json(serde_json::to_value(AcceptedResponse { accepted: true }).unwrap_or(serde_json::Value::Null)),
    )
}
