use anyhow::Context;

use hooklog_infra::HookConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hooklog_observability::init();

    let cfg = HookConfig::from_env().context("invalid configuration")?;
    let app = hooklog_api::app::build_app(&cfg).await?;

    let listener = tokio::net::TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
