use std::sync::Arc;

use anyhow::Context;

use server::config::Config;
use server::domain::records;
use server::error::LogErr;
use server::logging;
use server::repository::PgRepository;
use server::services::OperationService;
use server::tx::PgTransactionManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = Config::from_env()?;
    let pool = config
        .connect()
        .await
        .log_err("database connection failed")
        .context("failed to connect to database")?;

    records::ensure_schema(&pool)
        .await
        .context("failed to create records table")?;

    let repo = Arc::new(PgRepository::new(pool.clone()));
    let tx_manager = Arc::new(PgTransactionManager::postgres(pool));
    let service = OperationService::new(repo, tx_manager);

    let id = service
        .perform_operation()
        .await
        .log_err("operation failed")?;
    tracing::info!(id, "operation committed");

    let ids = service
        .perform_batch(vec!["first".to_string(), "second".to_string()])
        .await
        .log_err("batch failed")?;
    tracing::info!(?ids, "batch ids");

    if let Some(record) = service.find_record(id).await? {
        tracing::info!(id = record.id, value = %record.value, created_at = %record.created_at, "record");
    }

    let total = service.record_count().await?;
    tracing::info!(total, "records in table");

    Ok(())
}
