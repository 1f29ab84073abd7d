use anyhow::Result;
use sqlx::{Pool, Sqlite};

/// Applies `migrations/`: schema, the one-default-per-user index and the
/// category lifecycle triggers.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::debug!("migrations applied");
    Ok(())
}
