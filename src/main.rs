use anyhow::Result;
use bookshelf::config::AppConfig;
use bookshelf::server::ServerBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bookshelf=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let addr = config.bind_address();

    tracing::info!(%addr, "Starting bookshelf API");

    ServerBuilder::from_config(&config).await?.serve(&addr).await
}
