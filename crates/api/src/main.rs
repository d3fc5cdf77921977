use anyhow::{Context, Result};
use ferro_api::{build_app, ServiceConfig};
use ferro_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("ferro_api");

    let config = ServiceConfig::from_env();
    let app = build_app(&config)?;

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(bind = %config.bind, app = %config.app_name, "intent api started");

    axum::serve(listener, app).await?;
    Ok(())
}
