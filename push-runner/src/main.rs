use anyhow::Result;
use push_api::run as run_api;
use push_core::Config;
use push_core::PushContext;
use tracing;
use tracing_subscriber;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting push server");

    let config = Config::from_env();
    tracing::info!(
        "Activation service at {} (timeout {} ms)",
        config.powerauth.url,
        config.powerauth.timeout_ms
    );

    let ctx = PushContext::new(config).await?;
    tracing::info!("Push context initialized");

    run_api(ctx).await?;

    Ok(())
}
