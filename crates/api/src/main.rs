use anyhow::Context;

use comicverse_api::config::AppConfig;
use comicverse_observability::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    comicverse_observability::init(LogFormat::for_dev_mode(AppConfig::dev_mode_from_env()));

    let config = AppConfig::from_env().context("invalid configuration")?;
    let bind = config.bind;

    let app = comicverse_api::app::build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
