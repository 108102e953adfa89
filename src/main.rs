use crowdfund_data::{config, errors::Result};
use dotenvy::dotenv;
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

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Connect and make sure every table exists
    let db = config::database::create_connection()
        .await
        .inspect(|_| info!("Database connection established."))
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;

    config::database::create_tables(&db)
        .await
        .inspect(|_| info!("Schema is up to date."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 4. Seed reference data (sectors, feature flags, legal agreements)
    let seed_path = config::seed::seed_path();
    if let Some(seed) = config::seed::load_seed_config(&seed_path)
        .inspect_err(|e| error!("Failed to load seed file {}: {}", seed_path, e))?
    {
        config::seed::seed_reference_data(&db, &seed)
            .await
            .inspect(|report| info!(?report, "Reference data ready."))
            .inspect_err(|e| error!("Failed to seed reference data: {}", e))?;
    }

    Ok(())
}
