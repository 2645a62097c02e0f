use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process;

mod commands;

/// Standardized exit codes for CLI.
/// 0 = OK, 2 = input error (400/413/415), 4 = auth (401), 5 = upstream, timeout or server config (408/422/502/503), 1 = other.
#[allow(dead_code)]
const EXIT_OK: i32 = 0;
const EXIT_OTHER: i32 = 1;
const EXIT_INPUT: i32 = 2;
const EXIT_AUTH: i32 = 4;
const EXIT_UPSTREAM: i32 = 5;

#[derive(Parser)]
#[command(name = "sketchx", version, about = "Sketch gate CLI: generate, audit, normalize, preview")]
struct Cli {
    /// Gate server URL
    #[arg(long, env = "SKETCH_GATE_URL", default_value = "http://localhost:3000")]
    gate: String,

    /// Admin key for the provider-log endpoints
    #[arg(long, env = "SKETCH_ADMIN_KEY")]
    admin_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gate server health
    Health,
    /// Generate a component from an image URL
    Generate {
        image_url: String,
        /// Model to request (only gemini-* models are honoured)
        #[arg(long)]
        model: Option<String>,
        /// Do not switch to the fallback model
        #[arg(long)]
        no_fallback: bool,
        /// Write the code here instead of stdout
        #[arg(long)]
        out: Option<String>,
    },
    /// Show recent provider attempts (admin)
    Logs {
        #[arg(long, default_value_t = 50)]
        count: usize,
    },
    /// Aggregated provider report (admin)
    Report,
    /// Clear the provider log (admin)
    ClearLogs,
    /// Run the completeness heuristics on a local file (or - for stdin)
    Check {
        #[arg(default_value = "-")]
        file: String,
    },
    /// Normalize raw model output from a local file (or - for stdin)
    Normalize {
        #[arg(default_value = "-")]
        file: String,
        #[arg(long)]
        out: Option<String>,
        /// Print the stage report as JSON instead of the code
        #[arg(long)]
        json: bool,
    },
    /// Build the sandbox preview document for a local file
    Preview {
        #[arg(default_value = "-")]
        file: String,
        #[arg(long)]
        out: Option<String>,
        /// The file is raw model output; normalize it first
        #[arg(long)]
        raw: bool,
    },
}

/// Map error strings to exit codes based on HTTP status patterns.
fn exit_code_for(err: &str) -> i32 {
    if err.contains("HTTP 401") {
        EXIT_AUTH
    } else if ["HTTP 408", "HTTP 422", "HTTP 502", "HTTP 503"].iter().any(|s| err.contains(s)) {
        EXIT_UPSTREAM
    } else if err.contains("HTTP 400")
        || err.contains("HTTP 413")
        || err.contains("HTTP 415")
        || err.contains("read ")
        || err.contains("incomplete")
        || err.contains("no default export")
    {
        EXIT_INPUT
    } else {
        EXIT_OTHER
    }
}

fn main() {
    let cli = Cli::parse();
    let client = commands::Client::new(&cli.gate, cli.admin_key.as_deref());

    let result = match cli.command {
        Commands::Health => commands::health(&client),
        Commands::Generate { image_url, model, no_fallback, out } => {
            commands::generate(&client, &image_url, model.as_deref(), !no_fallback, out.as_deref())
        }
        Commands::Logs { count } => commands::logs(&client, count),
        Commands::Report => commands::report(&client),
        Commands::ClearLogs => commands::clear_logs(&client),
        Commands::Check { file } => commands::check(&file),
        Commands::Normalize { file, out, json } => commands::normalize(&file, out.as_deref(), json),
        Commands::Preview { file, out, raw } => commands::preview(&file, out.as_deref(), raw),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        process::exit(exit_code_for(&e));
    }
}
