//! Provider audit report: aggregates the attempt log into totals, per-model
//! and per-error counts, and a per-request timeline.

use serde::{Deserialize, Serialize};
use sketch_adapter::ProviderLogEntry;
use std::collections::BTreeMap;

/// Longest error label kept in `by_error`.
const ERROR_LABEL_MAX: usize = 80;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderReport {
    pub generated_at: String,
    pub summary: ReportSummary,
    pub by_model: BTreeMap<String, ModelStats>,
    pub by_provider: BTreeMap<String, usize>,
    pub by_error: BTreeMap<String, usize>,
    pub requests: Vec<RequestTimeline>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_attempts: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub pending: usize,
    pub fallback_attempts: usize,
    /// Succeeded over finished attempts; `None` when nothing has finished.
    pub success_rate: Option<f64>,
    pub avg_duration_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelStats {
    pub attempts: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// All attempts of one generation request, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTimeline {
    pub request_id: String,
    pub started_at: String,
    pub attempts: usize,
    pub models: Vec<String>,
    pub fallback_used: bool,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Group key for an error message: the part before the first detail
/// separator, capped in length.
pub fn error_label(message: &str) -> String {
    let head = message.split(" - ").next().unwrap_or(message).trim();
    head.chars().take(ERROR_LABEL_MAX).collect()
}

/// Build a report from log entries in any order.
pub fn generate_report(entries: &[ProviderLogEntry]) -> ProviderReport {
    let mut summary = ReportSummary::default();
    let mut by_model: BTreeMap<String, ModelStats> = BTreeMap::new();
    let mut by_provider: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_error: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_request: BTreeMap<&str, Vec<&ProviderLogEntry>> = BTreeMap::new();
    let mut durations = Vec::new();

    for e in entries {
        summary.total_attempts += 1;
        if e.fallback_used {
            summary.fallback_attempts += 1;
        }
        *by_provider.entry(e.provider.clone()).or_insert(0) += 1;
        let model = by_model.entry(e.model.clone()).or_default();
        model.attempts += 1;

        if e.is_pending() {
            summary.pending += 1;
        } else if e.success {
            summary.succeeded += 1;
            model.succeeded += 1;
        } else {
            summary.failed += 1;
            model.failed += 1;
            let label = e.error.as_deref().map(error_label).unwrap_or_else(|| "unknown".into());
            *by_error.entry(label).or_insert(0) += 1;
        }
        if let Some(ms) = e.duration_ms() {
            durations.push(ms as f64);
        }
        by_request.entry(e.request_id.as_str()).or_default().push(e);
    }

    let finished = summary.succeeded + summary.failed;
    if finished > 0 {
        summary.success_rate = Some(summary.succeeded as f64 / finished as f64);
    }
    if !durations.is_empty() {
        summary.avg_duration_ms = Some(durations.iter().sum::<f64>() / durations.len() as f64);
    }

    let mut requests: Vec<RequestTimeline> = by_request
        .into_iter()
        .map(|(request_id, mut attempts)| {
            attempts.sort_by_key(|e| (e.timestamp, e.attempt));
            let mut models: Vec<String> = Vec::new();
            for e in &attempts {
                if !models.contains(&e.model) {
                    models.push(e.model.clone());
                }
            }
            RequestTimeline {
                request_id: request_id.to_string(),
                started_at: attempts.first().map(|e| e.timestamp.to_rfc3339()).unwrap_or_default(),
                attempts: attempts.len(),
                models,
                fallback_used: attempts.iter().any(|e| e.fallback_used),
                succeeded: attempts.iter().any(|e| e.success),
                last_error: attempts.iter().rev().find_map(|e| e.error.clone()),
            }
        })
        .collect();
    requests.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| a.request_id.cmp(&b.request_id)));

    ProviderReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        summary,
        by_model,
        by_provider,
        by_error,
        requests,
    }
}
