use anyhow::Context;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::DatabaseManager;

pub async fn handle(config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("connecting to the database")?;
    DatabaseManager::migrate(&pool).await.context("running migrations")?;

    output_success(
        &output_format,
        "Migrations applied",
        Some(json!({ "database": DatabaseManager::redacted(&config.database.url) })),
    )
}
