//! History database schema

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

/// File name of the history database inside the plugin directory
pub const HISTORY_DB_FILE: &str = "history.db";

/// Open (creating if needed) the history database and its tables
pub async fn initialize_database(db_path: &Path) -> Result<Pool<Sqlite>> {
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    debug!("Opening history database at: {}", db_path.display());
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open {}", db_path.display()))?;

    info!("Running database migrations");
    create_tables(&pool).await?;

    Ok(pool)
}

async fn create_tables(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS history (
            id TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            file_path TEXT,
            success BOOLEAN NOT NULL,
            timestamp DATETIME NOT NULL,
            format TEXT NOT NULL,
            error_message TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_history_timestamp ON history(timestamp)")
        .execute(pool)
        .await?;

    debug!("Database tables created successfully");
    Ok(())
}
