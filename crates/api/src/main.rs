use std::sync::Arc;

use anyhow::Context;

use tillcredit_api::{app, config::ApiConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tillcredit_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    let services = Arc::new(app::services::build_services(&config).await?);
    let app = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        store = config.store.label(),
        include_unbilled = config.include_unbilled,
        "listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
