use reqwest::Client;
use serde_json::{json, Value};
use sketch_adapter::fakes::{RecordingSleeper, ScriptedGenerator, VALID_COMPONENT};
use sketch_adapter::{GenerateError, Generator};
use sketch_gate::config::GateConfig;
use sketch_gate::AppState;
use std::sync::Arc;

const ADMIN_KEY: &str = "s3cret";

async fn setup(
    admin_key: Option<&str>,
    log_capacity: usize,
    script: Vec<Result<String, GenerateError>>,
) -> (String, Client, tokio::task::JoinHandle<()>) {
    let mut config = GateConfig::default();
    config.admin_api_key = admin_key.map(str::to_string);
    config.log_capacity = log_capacity;
    let generator: Arc<dyn Generator> = Arc::new(ScriptedGenerator::new(script));
    let state = AppState::build(config, Some(generator), Arc::new(RecordingSleeper::default()));
    let (addr, handle) = sketch_gate::test::spawn(state).await;
    (format!("http://{}", addr), Client::new(), handle)
}

async fn run_generations(http: &Client, base: &str, n: usize) {
    for i in 0..n {
        let resp = http
            .post(format!("{base}/v1/generate"))
            .json(&json!({"imageUrl": format!("https://img.example/{i}.png")}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }
}

fn ok_script(n: usize) -> Vec<Result<String, GenerateError>> {
    (0..n).map(|_| Ok(VALID_COMPONENT.to_string())).collect()
}

// ── Access control ───────────────────────────────────────────────

#[tokio::test]
async fn admin_disabled_without_configured_key() {
    let (base, http, _h) = setup(None, 200, vec![]).await;
    let resp = http
        .get(format!("{base}/v1/admin/provider-logs"))
        .header("x-admin-key", "anything")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "not_configured");
}

#[tokio::test]
async fn admin_rejects_missing_or_wrong_key() {
    let (base, http, _h) = setup(Some(ADMIN_KEY), 200, vec![]).await;
    let missing = http.get(format!("{base}/v1/admin/provider-logs")).send().await.unwrap();
    assert_eq!(missing.status(), 401);

    let wrong = http
        .get(format!("{base}/v1/admin/provider-logs"))
        .header("x-admin-key", "nope")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 401);

    let report = http.get(format!("{base}/v1/admin/provider-logs/report")).send().await.unwrap();
    assert_eq!(report.status(), 401);
    let resp = http.delete(format!("{base}/v1/admin/provider-logs")).send().await.unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn auth_is_checked_before_query_parsing() {
    let (base, http, _h) = setup(Some(ADMIN_KEY), 200, vec![]).await;
    let resp = http
        .get(format!("{base}/v1/admin/provider-logs?count=lots"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

// ── Query ────────────────────────────────────────────────────────

#[tokio::test]
async fn logs_are_newest_first_and_counted() {
    let (base, http, _h) = setup(Some(ADMIN_KEY), 200, ok_script(3)).await;
    run_generations(&http, &base, 3).await;

    let body: Value = http
        .get(format!("{base}/v1/admin/provider-logs?count=2"))
        .header("x-admin-key", ADMIN_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let logs = body["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["image_url"], "https://img.example/2.png");
    assert_eq!(logs[1]["image_url"], "https://img.example/1.png");
    assert_eq!(logs[0]["success"], true);
    assert_eq!(logs[0]["model"], "gemini-1.5-flash");
    assert!(logs[0]["finished_at"].is_string());
}

#[tokio::test]
async fn invalid_count_is_400() {
    let (base, http, _h) = setup(Some(ADMIN_KEY), 200, vec![]).await;
    let resp = http
        .get(format!("{base}/v1/admin/provider-logs?count=-1"))
        .header("x-admin-key", ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn ring_capacity_is_enforced() {
    let (base, http, _h) = setup(Some(ADMIN_KEY), 3, ok_script(4)).await;
    run_generations(&http, &base, 4).await;

    let body: Value = http
        .get(format!("{base}/v1/admin/provider-logs?count=100"))
        .header("x-admin-key", ADMIN_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let logs = body["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0]["image_url"], "https://img.example/3.png");
    assert!(logs.iter().all(|l| l["image_url"] != "https://img.example/0.png"));
}

// ── Report and clear ─────────────────────────────────────────────

#[tokio::test]
async fn report_aggregates_attempts() {
    let script = vec![
        Err(GenerateError::Provider("gemini api error: 500 - oops".into())),
        Ok(VALID_COMPONENT.to_string()),
    ];
    let (base, http, _h) = setup(Some(ADMIN_KEY), 200, script).await;
    run_generations(&http, &base, 1).await;

    let report: Value = http
        .get(format!("{base}/v1/admin/provider-logs/report"))
        .header("x-admin-key", ADMIN_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["summary"]["total_attempts"], 2);
    assert_eq!(report["summary"]["succeeded"], 1);
    assert_eq!(report["summary"]["failed"], 1);
    assert_eq!(report["summary"]["success_rate"], 0.5);
    assert_eq!(report["by_model"]["gemini-1.5-flash"]["attempts"], 2);
    assert_eq!(report["by_error"]["provider: gemini api error: 500"], 1);
    assert_eq!(report["requests"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn clear_empties_the_log() {
    let (base, http, _h) = setup(Some(ADMIN_KEY), 200, ok_script(2)).await;
    run_generations(&http, &base, 2).await;

    let body: Value = http
        .delete(format!("{base}/v1/admin/provider-logs"))
        .header("x-admin-key", ADMIN_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["cleared"], 2);

    let body: Value = http
        .get(format!("{base}/v1/admin/provider-logs"))
        .header("x-admin-key", ADMIN_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["logs"].as_array().unwrap().is_empty());
}
