use sketch_gate::{config::GateConfig, AppState};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();
    let config = GateConfig::from_env();
    let bind = config.bind.clone();
    let state = AppState::from_config(config)?;
    let app = sketch_gate::app(state);
    let listener = TcpListener::bind(&bind).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
