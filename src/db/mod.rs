pub mod models;
pub mod registry;
pub mod snapshots;

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::Result;

pub use registry::MatchRegistry;
pub use snapshots::SnapshotStore;

/// Open (creating if needed) the SQLite file and apply pending migrations.
pub async fn open(db_path: &str) -> Result<SqlitePool> {
    if let Some(parent) = Path::new(db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Largest batch timestamp ever written, used to seed the batch clock.
pub async fn max_batch_ts(pool: &SqlitePool) -> Result<Option<i64>> {
    let ts = sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(batch_ts) FROM tickets")
        .fetch_one(pool)
        .await?;
    Ok(ts)
}

/// Single-connection in-memory database with the schema applied.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let options = "sqlite::memory:"
        .parse::<SqliteConnectOptions>()
        .expect("valid sqlite url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<std::time::Duration>)
        .max_lifetime(None::<std::time::Duration>)
        .connect_with(options)
        .await
        .expect("in-memory sqlite");
    migrate(&pool).await.expect("migrations apply");
    pool
}
