use axum::{
    extract::{Query, State},
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sketch_adapter::provider_log::DEFAULT_QUERY_COUNT;
use sketch_adapter::{GenerateRequest, ProviderLogEntry};

use crate::audit::{generate_report, ProviderReport};
use crate::auth::AdminAccess;
use crate::error::AppError;
use crate::upload::{sign, UploadSignature};
use crate::AppState;

// ── Generate ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "yes", alias = "allowFallback")]
    pub allow_fallback: bool,
}

fn yes() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub code: String,
    pub component: String,
    pub digest: String,
    pub model: String,
    pub provider: String,
    pub fallback_used: bool,
    pub attempts: u32,
    pub request_id: String,
}

/// POST /v1/generate: image URL in, normalized component source out.
pub async fn generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<GenerateResponse>, AppError> {
    let image_url = body
        .image_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::bad_request("imageUrl is required"))?;
    let service = state
        .generation
        .as_ref()
        .ok_or_else(|| AppError::not_configured("Gemini not configured. Set GEMINI_API_KEY"))?;

    let request = GenerateRequest { image_url, model: body.model, allow_fallback: body.allow_fallback };
    let generated = service.run(&request).await?;
    Ok(Json(GenerateResponse {
        code: generated.source.code,
        component: generated.source.component,
        digest: generated.source.digest,
        model: generated.model,
        provider: generated.provider,
        fallback_used: generated.fallback_used,
        attempts: generated.attempts,
        request_id: generated.request_id,
    }))
}

// ── Preview ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PreviewBody {
    pub code: String,
    /// `code` is raw model output; run the normalizer first.
    #[serde(default)]
    pub raw: bool,
}

/// POST /v1/preview: sandbox document for already-normalized code.
pub async fn preview(Json(body): Json<PreviewBody>) -> Result<Html<String>, AppError> {
    if body.code.trim().is_empty() {
        return Err(AppError::bad_request("code is required"));
    }
    let code = if body.raw {
        sketch_normalize::normalize(&body.code)
            .map_err(|e| match e {
                sketch_normalize::NormalizeError::NoDefaultExport => AppError::no_default_export(e.to_string()),
                other => AppError::unprocessable(other.to_string()),
            })?
            .code
    } else {
        body.code
    };
    Ok(Html(sketch_normalize::build_document(&code).into_html()))
}

// ── Provider logs (admin) ────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<ProviderLogEntry>,
}

/// GET /v1/admin/provider-logs?count=N, newest first.
pub async fn provider_logs(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Query(q): Query<LogsQuery>,
) -> Json<LogsResponse> {
    let count = q.count.unwrap_or(DEFAULT_QUERY_COUNT);
    Json(LogsResponse { logs: state.logs.recent(count) })
}

/// GET /v1/admin/provider-logs/report
pub async fn provider_report(_admin: AdminAccess, State(state): State<AppState>) -> Json<ProviderReport> {
    Json(generate_report(&state.logs.snapshot()))
}

/// DELETE /v1/admin/provider-logs
pub async fn clear_provider_logs(_admin: AdminAccess, State(state): State<AppState>) -> Json<Value> {
    let cleared = state.logs.clear();
    tracing::info!(cleared, "provider log cleared");
    Json(json!({"cleared": cleared}))
}

// ── Uploads ──────────────────────────────────────────────────────

/// POST /v1/uploads/sign
pub async fn sign_upload(State(state): State<AppState>) -> Result<Json<UploadSignature>, AppError> {
    let creds = state
        .config
        .upload
        .as_ref()
        .ok_or_else(|| AppError::not_configured("upload credentials not configured on server"))?;
    Ok(Json(sign(creds, chrono::Utc::now().timestamp())))
}
