#![allow(clippy::result_large_err)]

use dotenvy::dotenv;
use std::{env, sync::Arc};
use storefront_bot::{
    bot,
    config::{database, store},
    errors::{Error, Result},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load and validate config.toml
    let app_config = store::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    info!(
        admins = app_config.admin_ids.len(),
        required_channels = app_config.required_channels.len(),
        "Configuration loaded."
    );

    // 4. Connect to the database and make sure the schema exists
    if env::var("DATABASE_URL").is_err() {
        std::fs::create_dir_all("data")?;
    }
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Run the bot. BOT_TOKEN is read directly before use, never stored in AppConfig
    let token = env::var("BOT_TOKEN")
        .inspect_err(|e| error!("BOT_TOKEN not found: {}", e))
        .map_err(Error::EnvVar)?;

    bot::run_bot(token, Arc::new(app_config), db).await
}
