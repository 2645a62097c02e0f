pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod upload;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use sketch_adapter::gemini::GeminiGenerator;
use sketch_adapter::{GenerationService, Generator, ProviderLogBook, Sleeper, TokioSleeper};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::config::GateConfig;
use crate::error::AppError;

/// Max request body size: 1 MiB
const MAX_BODY_BYTES: usize = 1_048_576;
/// Covers every retry and the fallback pass of a generation.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GateConfig>,
    pub logs: Arc<ProviderLogBook>,
    /// Absent when no model provider is configured.
    pub generation: Option<Arc<GenerationService>>,
}

impl AppState {
    /// Production wiring: Gemini when a key is set, real timers.
    pub fn from_config(config: GateConfig) -> anyhow::Result<Self> {
        let generator: Option<Arc<dyn Generator>> = match config.gemini_api_key.as_deref() {
            Some(key) => Some(Arc::new(GeminiGenerator::new(key)?)),
            None => {
                tracing::warn!("GEMINI_API_KEY not set, generation disabled");
                None
            }
        };
        Ok(Self::build(config, generator, Arc::new(TokioSleeper)))
    }

    /// Wire any generator and sleeper, e.g. scripted fakes in tests.
    pub fn build(config: GateConfig, generator: Option<Arc<dyn Generator>>, sleeper: Arc<dyn Sleeper>) -> Self {
        let logs = Arc::new(ProviderLogBook::new(config.log_capacity));
        let generation = generator.map(|g| {
            Arc::new(GenerationService::new(g, logs.clone(), sleeper, config.generation.clone()))
        });
        Self { config: Arc::new(config), logs, generation }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/generate", post(api::generate))
        .route("/v1/preview", post(api::preview))
        .route("/v1/admin/provider-logs", get(api::provider_logs).delete(api::clear_provider_logs))
        .route("/v1/admin/provider-logs/report", get(api::provider_report))
        .route("/v1/uploads/sign", post(api::sign_upload))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(middleware::from_fn(require_json_content_type))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Middleware: reject POST/PUT/PATCH requests without application/json content-type.
async fn require_json_content_type(req: Request, next: Next) -> Response {
    let is_json = match req.method().as_str() {
        "POST" | "PUT" | "PATCH" => req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false),
        _ => true,
    };
    if !is_json {
        return AppError::unsupported_media_type().into_response();
    }
    next.run(req).await
}

async fn healthz(axum::extract::State(state): axum::extract::State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "generation": state.generation.is_some(),
        "admin": state.config.admin_api_key.is_some(),
        "uploads": state.config.upload.is_some(),
    }))
}

pub mod test {
    use super::*;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    /// Spawn the router for `state` on a random port. Returns the address
    /// and a JoinHandle that keeps the server alive until dropped.
    pub async fn spawn(state: AppState) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let app = app(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, handle)
    }
}
