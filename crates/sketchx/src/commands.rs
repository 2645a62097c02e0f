use colored::Colorize;
use serde_json::{json, Value};
use std::fs;
use std::io::{self, Read};

pub struct Client {
    base: String,
    http: reqwest::blocking::Client,
    admin_key: Option<String>,
}

impl Client {
    pub fn new(base: &str, admin_key: Option<&str>) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            http: reqwest::blocking::Client::builder()
                .timeout(std::time::Duration::from_secs(150))
                .build()
                .unwrap_or_default(),
            admin_key: admin_key.map(|k| k.to_string()),
        }
    }

    fn send(&self, req: reqwest::blocking::RequestBuilder) -> Result<Value, String> {
        let resp = req.send().map_err(|e| format!("request failed: {e}"))?;
        let status = resp.status();
        if status.is_success() {
            return resp.json().map_err(|e| format!("parse response: {e}"));
        }
        let body = resp.text().unwrap_or_default();
        Err(http_error(status.as_u16(), &body))
    }

    fn get(&self, path: &str) -> Result<Value, String> {
        self.send(self.http.get(format!("{}{}", self.base, path)))
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value, String> {
        self.send(self.http.post(format!("{}{}", self.base, path)).json(body))
    }

    fn admin(&self, req: reqwest::blocking::RequestBuilder) -> Result<Value, String> {
        let key = self
            .admin_key
            .as_deref()
            .ok_or("missing admin key (use --admin-key or SKETCH_ADMIN_KEY)")?;
        self.send(req.header("x-admin-key", key))
    }

    fn admin_get(&self, path: &str) -> Result<Value, String> {
        self.admin(self.http.get(format!("{}{}", self.base, path)))
    }

    fn admin_delete(&self, path: &str) -> Result<Value, String> {
        self.admin(self.http.delete(format!("{}{}", self.base, path)))
    }
}

/// `HTTP <status>: <code>: <message>` from a gate error body. Bodies that are
/// not the gate's JSON (timeouts, size limits, extractor rejections) keep the
/// status and use the raw text.
fn http_error(status: u16, body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => {
            let code = json.get("code").and_then(|c| c.as_str()).unwrap_or("error");
            let message = json.get("message").and_then(|m| m.as_str()).unwrap_or("unknown error");
            format!("HTTP {status}: {code}: {message}")
        }
        Err(_) => {
            let text = body.trim();
            if text.is_empty() {
                format!("HTTP {status}")
            } else {
                format!("HTTP {status}: {text}")
            }
        }
    }
}

fn read_input(file: &str) -> Result<String, String> {
    if file == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).map_err(|e| format!("read stdin: {e}"))?;
        Ok(buf)
    } else {
        fs::read_to_string(file).map_err(|e| format!("read file: {e}"))
    }
}

fn write_output(out: Option<&str>, content: &str) -> Result<(), String> {
    match out {
        Some(path) => {
            fs::write(path, content).map_err(|e| format!("write {path}: {e}"))?;
            eprintln!("{} wrote {} ({} bytes)", "✓".green(), path.cyan(), content.len());
        }
        None => println!("{content}"),
    }
    Ok(())
}

// ── health ──────────────────────────────────────────────────────

pub fn health(client: &Client) -> Result<(), String> {
    let json = client.get("/healthz")?;
    let flag = |k: &str| {
        if json.get(k).and_then(|v| v.as_bool()).unwrap_or(false) {
            "on".green()
        } else {
            "off".yellow()
        }
    };
    println!("{} {}", "●".green(), "ok".green().bold());
    println!("  {} {}", "generation:".dimmed(), flag("generation"));
    println!("  {} {}", "admin:     ".dimmed(), flag("admin"));
    println!("  {} {}", "uploads:   ".dimmed(), flag("uploads"));
    Ok(())
}

// ── generate ────────────────────────────────────────────────────

pub fn generate(
    client: &Client,
    image_url: &str,
    model: Option<&str>,
    allow_fallback: bool,
    out: Option<&str>,
) -> Result<(), String> {
    let mut body = json!({ "imageUrl": image_url, "allowFallback": allow_fallback });
    if let Some(m) = model {
        body["model"] = json!(m);
    }
    let json = client.post("/v1/generate", &body)?;
    let s = |k: &str| json.get(k).and_then(|v| v.as_str()).unwrap_or("?").to_string();

    eprintln!("{} {}", "Component:".dimmed(), s("component").cyan().bold());
    eprintln!("{} {} ({})", "Model:    ".dimmed(), s("model"), s("provider").dimmed());
    eprintln!(
        "{} {}",
        "Attempts: ".dimmed(),
        json.get("attempts").and_then(|v| v.as_u64()).unwrap_or(0)
    );
    if json.get("fallback_used").and_then(|v| v.as_bool()).unwrap_or(false) {
        eprintln!("{}", "  (fallback model used)".yellow());
    }
    eprintln!("{} {}", "Digest:   ".dimmed(), s("digest").dimmed());
    write_output(out, &s("code"))
}

// ── provider log (admin) ────────────────────────────────────────

pub fn logs(client: &Client, count: usize) -> Result<(), String> {
    let json = client.admin_get(&format!("/v1/admin/provider-logs?count={count}"))?;
    let entries = json.get("logs").and_then(|l| l.as_array()).cloned().unwrap_or_default();
    if entries.is_empty() {
        println!("{}", "No provider attempts logged.".dimmed());
        return Ok(());
    }
    for e in &entries {
        let s = |k: &str| e.get(k).and_then(|v| v.as_str()).unwrap_or("").to_string();
        let badge = if e.get("finished_at").map_or(true, Value::is_null) {
            "…".yellow()
        } else if e.get("success").and_then(|v| v.as_bool()).unwrap_or(false) {
            "✓".green()
        } else {
            "✗".red()
        };
        let attempt = e.get("attempt").and_then(|v| v.as_u64()).unwrap_or(0);
        let fallback = if e.get("fallback_used").and_then(|v| v.as_bool()).unwrap_or(false) {
            " fallback".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "{} {} {} #{}{} {}",
            badge,
            s("timestamp").dimmed(),
            s("model").blue(),
            attempt,
            fallback,
            s("request_id").dimmed()
        );
        let err = s("error");
        if !err.is_empty() {
            println!("    {}", err.red());
        }
    }
    Ok(())
}

pub fn report(client: &Client) -> Result<(), String> {
    let json = client.admin_get("/v1/admin/provider-logs/report")?;
    let summary = json.get("summary").cloned().unwrap_or_default();
    let n = |k: &str| summary.get(k).and_then(|v| v.as_u64()).unwrap_or(0);

    println!("{}", "Provider report".bold());
    println!("  {} {}", "Attempts:".dimmed(), n("total_attempts"));
    println!(
        "  {} {} ok, {} failed, {} pending",
        "Outcome: ".dimmed(),
        n("succeeded").to_string().green(),
        n("failed").to_string().red(),
        n("pending")
    );
    if let Some(rate) = summary.get("success_rate").and_then(|v| v.as_f64()) {
        println!("  {} {:.1}%", "Success: ".dimmed(), rate * 100.0);
    }
    if let Some(ms) = summary.get("avg_duration_ms").and_then(|v| v.as_f64()) {
        println!("  {} {:.0} ms", "Avg time:".dimmed(), ms);
    }
    if let Some(models) = json.get("by_model").and_then(|m| m.as_object()) {
        println!("  {}:", "By model".dimmed());
        for (model, stats) in models {
            let g = |k: &str| stats.get(k).and_then(|v| v.as_u64()).unwrap_or(0);
            println!("    {} {} attempts, {} ok", model.blue(), g("attempts"), g("succeeded"));
        }
    }
    if let Some(errors) = json.get("by_error").and_then(|m| m.as_object()) {
        if !errors.is_empty() {
            println!("  {}:", "By error".dimmed());
            for (label, count) in errors {
                println!("    {} {}", count, label.red());
            }
        }
    }
    Ok(())
}

pub fn clear_logs(client: &Client) -> Result<(), String> {
    let json = client.admin_delete("/v1/admin/provider-logs")?;
    let cleared = json.get("cleared").and_then(|v| v.as_u64()).unwrap_or(0);
    println!("{} cleared {} entries", "✓".green(), cleared);
    Ok(())
}

// ── offline ─────────────────────────────────────────────────────

pub fn check(file: &str) -> Result<(), String> {
    let raw = read_input(file)?;
    let stripped = sketch_normalize::strip_fences(&raw);
    let report = sketch_normalize::completeness::inspect(&stripped);

    let mark = |ok: bool| if ok { "✓".green() } else { "✗".red() };
    println!("  {} ui library token", mark(report.has_ui_library));
    println!("  {} declaration keyword", mark(report.has_declaration));
    println!(
        "  {} braces {} open / {} close",
        mark(report.braces_balanced()),
        report.open_braces,
        report.close_braces
    );
    println!(
        "  {} trailing delimiter {}",
        mark(report.trailing_opener.is_none()),
        report.trailing_opener.map(|c| c.to_string()).unwrap_or_else(|| "none".into())
    );
    println!(
        "  {} tags {} open / {} close / {} self-closing",
        mark(report.tags_balanced()),
        report.open_tags,
        report.close_tags,
        report.self_closing_tags
    );

    if report.looks_incomplete() {
        return Err(format!("code looks incomplete: {}", report.findings().join(", ")));
    }
    println!("{} complete", "✓".green().bold());
    Ok(())
}

pub fn normalize(file: &str, out: Option<&str>, as_json: bool) -> Result<(), String> {
    let raw = read_input(file)?;
    if as_json {
        let inspection = sketch_normalize::pipeline::inspect(&raw);
        let pretty = serde_json::to_string_pretty(&inspection).map_err(|e| format!("encode report: {e}"))?;
        return write_output(out, &pretty);
    }
    let normalized = sketch_normalize::normalize(&raw).map_err(|e| e.to_string())?;
    eprintln!("{} {}", "Component:".dimmed(), normalized.component.cyan().bold());
    eprintln!("{} {}", "Digest:   ".dimmed(), normalized.digest.dimmed());
    write_output(out, &normalized.code)
}

pub fn preview(file: &str, out: Option<&str>, raw: bool) -> Result<(), String> {
    let input = read_input(file)?;
    let code = if raw {
        sketch_normalize::normalize(&input).map_err(|e| e.to_string())?.code
    } else {
        input
    };
    write_output(out, sketch_normalize::build_document(&code).as_str())
}
