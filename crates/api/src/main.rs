use anyhow::Context;

use petstore_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    petstore_observability::init_with(config.log_format);

    let app = petstore_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        backend = config.backend_name(),
        customer_policy = ?config.customer_policy,
        "listening"
    );

    axum::serve(listener, app).await.context("server terminated")?;
    Ok(())
}
