pub mod connection;
pub mod migrate;
pub mod provision;
pub mod queries;

#[cfg(test)]
pub(crate) async fn test_pool() -> sqlx::SqlitePool {
    let pool = connection::memory_pool().await.expect("open in-memory database");
    migrate::run_migrations(&pool).await.expect("apply migrations");
    pool
}
