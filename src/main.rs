use devcamper_api::{config::AppConfig, server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("devcamper_api=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env();
    if let Err(e) = server::run(config).await {
        tracing::error!("Server exited: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
