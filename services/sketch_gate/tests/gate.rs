use reqwest::Client;
use serde_json::{json, Value};
use sketch_adapter::fakes::{RecordingSleeper, ScriptedGenerator, VALID_COMPONENT};
use sketch_adapter::{GenerateError, Generator};
use sketch_gate::config::GateConfig;
use sketch_gate::upload::UploadCredentials;
use sketch_gate::AppState;
use std::sync::Arc;

const ADMIN_KEY: &str = "test-admin-key";

fn config() -> GateConfig {
    let mut config = GateConfig::default();
    config.admin_api_key = Some(ADMIN_KEY.into());
    config.generation.fallback_model = Some("gemini-1.5-pro".into());
    config
}

async fn setup_with(
    config: GateConfig,
    script: Option<Vec<Result<String, GenerateError>>>,
) -> (String, Client, tokio::task::JoinHandle<()>) {
    let generator = script.map(|s| Arc::new(ScriptedGenerator::new(s)) as Arc<dyn Generator>);
    let state = AppState::build(config, generator, Arc::new(RecordingSleeper::default()));
    let (addr, handle) = sketch_gate::test::spawn(state).await;
    (format!("http://{}", addr), Client::new(), handle)
}

async fn setup(script: Vec<Result<String, GenerateError>>) -> (String, Client, tokio::task::JoinHandle<()>) {
    setup_with(config(), Some(script)).await
}

fn provider_down() -> Result<String, GenerateError> {
    Err(GenerateError::Provider("gemini api error: 503 Service Unavailable".into()))
}

async fn generate(http: &Client, base: &str, body: Value) -> reqwest::Response {
    http.post(format!("{base}/v1/generate")).json(&body).send().await.unwrap()
}

async fn logs(http: &Client, base: &str) -> Vec<Value> {
    let body: Value = http
        .get(format!("{base}/v1/admin/provider-logs"))
        .header("x-admin-key", ADMIN_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["logs"].as_array().unwrap().clone()
}

// ── Health ───────────────────────────────────────────────────────

#[tokio::test]
async fn healthz_reports_ok() {
    let (base, http, _h) = setup(vec![]).await;
    let body: Value = http.get(format!("{base}/healthz")).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["generation"], true);
}

// ── Generate ─────────────────────────────────────────────────────

#[tokio::test]
async fn generate_returns_normalized_code() {
    let (base, http, _h) = setup(vec![Ok(VALID_COMPONENT.into())]).await;
    let resp = generate(&http, &base, json!({"imageUrl": "https://img.example/a.png"})).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();

    let code = body["code"].as_str().unwrap();
    assert!(code.starts_with("const React = window.React;"));
    assert!(!code.contains("import "));
    assert!(!code.contains("export "));
    assert_eq!(code.matches("window.__PREVIEW_COMPONENT__ = App;").count(), 1);
    assert_eq!(body["component"], "App");
    assert!(body["digest"].as_str().unwrap().starts_with("b3:"));
    assert_eq!(body["model"], "gemini-1.5-flash");
    assert_eq!(body["provider"], "scripted");
    assert_eq!(body["fallback_used"], false);
    assert_eq!(body["attempts"], 1);
}

#[tokio::test]
async fn generate_accepts_snake_case_field() {
    let (base, http, _h) = setup(vec![Ok(VALID_COMPONENT.into())]).await;
    let resp = generate(&http, &base, json!({"image_url": "https://img.example/a.png"})).await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn generate_requires_image_url() {
    let (base, http, _h) = setup(vec![]).await;
    let resp = generate(&http, &base, json!({})).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "bad_request");

    let resp = generate(&http, &base, json!({"imageUrl": "   "})).await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn generate_without_provider_is_503() {
    let (base, http, _h) = setup_with(config(), None).await;
    let resp = generate(&http, &base, json!({"imageUrl": "https://img.example/a.png"})).await;
    assert_eq!(resp.status(), 503);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "not_configured");
}

#[tokio::test]
async fn generate_retries_then_succeeds() {
    let (base, http, _h) = setup(vec![provider_down(), Ok(VALID_COMPONENT.into())]).await;
    let body: Value = generate(&http, &base, json!({"imageUrl": "https://img.example/a.png"}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["attempts"], 2);
    assert_eq!(body["fallback_used"], false);

    let entries = logs(&http, &base).await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["success"], true);
    assert_eq!(entries[1]["success"], false);
    assert_eq!(entries[0]["request_id"], entries[1]["request_id"]);
}

#[tokio::test]
async fn generate_falls_back_after_exhausting_primary() {
    let script = vec![provider_down(), provider_down(), provider_down(), Ok(VALID_COMPONENT.into())];
    let (base, http, _h) = setup(script).await;
    let body: Value = generate(&http, &base, json!({"imageUrl": "https://img.example/a.png"}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["fallback_used"], true);
    assert_eq!(body["model"], "gemini-1.5-pro");
    assert_eq!(body["attempts"], 4);
}

#[tokio::test]
async fn generate_exhausted_is_502() {
    let script = vec![provider_down(), provider_down(), provider_down()];
    let (base, http, _h) = setup(script).await;
    let resp = generate(
        &http,
        &base,
        json!({"imageUrl": "https://img.example/a.png", "allowFallback": false}),
    )
    .await;
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "provider_failed");
    assert_eq!(body["attempts"], 3);
    assert!(body["request_id"].is_string());
    assert!(body["message"].as_str().unwrap().contains("503"));
}

#[tokio::test]
async fn generate_without_default_export_is_422() {
    let (base, http, _h) = setup(vec![Ok("import React from 'react';\nconst App = () => <div/>;".into())]).await;
    let resp = generate(&http, &base, json!({"imageUrl": "https://img.example/a.png"})).await;
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "no_default_export");
    assert_eq!(body["attempts"], 1);
}

#[tokio::test]
async fn generate_rejects_non_json() {
    let (base, http, _h) = setup(vec![]).await;
    let resp = http
        .post(format!("{base}/v1/generate"))
        .header("content-type", "text/plain")
        .body("imageUrl=x")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 415);
}

#[tokio::test]
async fn generate_rejects_malformed_json() {
    let (base, http, _h) = setup(vec![]).await;
    let resp = http
        .post(format!("{base}/v1/generate"))
        .header("content-type", "application/json")
        .body("{not json}")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error(), "malformed JSON must fail");
}

// ── Preview ──────────────────────────────────────────────────────

#[tokio::test]
async fn preview_returns_sandbox_document() {
    let (base, http, _h) = setup(vec![]).await;
    let resp = http
        .post(format!("{base}/v1/preview"))
        .json(&json!({"code": "const s = '</script>';\nwindow.__PREVIEW_COMPONENT__ = () => null;"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let ct = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(ct.starts_with("text/html"), "content-type: {ct}");
    let html = resp.text().await.unwrap();
    assert!(html.starts_with("<!doctype html>"));
    assert!(html.contains(r"const s = '<\/script>';"));
    assert!(html.contains("@babel/standalone"));
}

#[tokio::test]
async fn preview_can_normalize_raw_output() {
    let (base, http, _h) = setup(vec![]).await;
    let resp = http
        .post(format!("{base}/v1/preview"))
        .json(&json!({"code": VALID_COMPONENT, "raw": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert!(html.contains("window.__PREVIEW_COMPONENT__ = App;"));
    assert!(!html.contains("import React"));
}

#[tokio::test]
async fn preview_rejects_empty_code() {
    let (base, http, _h) = setup(vec![]).await;
    let resp = http.post(format!("{base}/v1/preview")).json(&json!({"code": "  "})).send().await.unwrap();
    assert_eq!(resp.status(), 400);
}

// ── Uploads ──────────────────────────────────────────────────────

#[tokio::test]
async fn upload_signing_requires_credentials() {
    let (base, http, _h) = setup(vec![]).await;
    let resp = http.post(format!("{base}/v1/uploads/sign")).json(&json!({})).send().await.unwrap();
    assert_eq!(resp.status(), 503);
}

#[tokio::test]
async fn upload_signing_returns_signature() {
    let mut cfg = config();
    cfg.upload = Some(UploadCredentials {
        cloud_name: "demo".into(),
        api_key: "1234".into(),
        api_secret: "abcd".into(),
    });
    let (base, http, _h) = setup_with(cfg, None).await;
    let body: Value = http
        .post(format!("{base}/v1/uploads/sign"))
        .json(&json!({}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["signature"].as_str().unwrap().len(), 40);
    assert!(body["timestamp"].as_i64().unwrap() > 1_700_000_000);
    assert_eq!(body["api_key"], "1234");
    assert_eq!(body["cloud_name"], "demo");
    assert_eq!(body["signature_algorithm"], "sha1");
    assert!(body.get("api_secret").is_none());
}
