//! Download history records

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::schema::initialize_database;

/// One finished (or failed) download
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: String,
    pub url: String,
    pub file_path: Option<PathBuf>,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    /// Quality/format description, e.g. `720p mp4`
    pub format: String,
    pub error_message: Option<String>,
}

impl HistoryEntry {
    pub fn succeeded(url: &str, file_path: Option<PathBuf>, format: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.to_string(),
            file_path,
            success: true,
            timestamp: Utc::now(),
            format: format.to_string(),
            error_message: None,
        }
    }

    pub fn failed(url: &str, format: &str, error_message: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.to_string(),
            file_path: None,
            success: false,
            timestamp: Utc::now(),
            format: format.to_string(),
            error_message: Some(error_message.to_string()),
        }
    }

    /// One-line summary used by the `history` query and CLI
    pub fn summary(&self) -> String {
        let status = if self.success { "ok" } else { "failed" };
        format!(
            "{} [{}] {} ({})",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            status,
            self.url,
            self.format
        )
    }
}

/// Sqlite-backed download history
#[derive(Debug, Clone)]
pub struct DownloadHistory {
    pool: Pool<Sqlite>,
}

impl DownloadHistory {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Open the database at `db_path`, creating it on first use
    pub async fn open(db_path: &Path) -> Result<Self> {
        Ok(Self::new(initialize_database(db_path).await?))
    }

    pub async fn record(&self, entry: &HistoryEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO history
            (id, url, file_path, success, timestamp, format, error_message)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.url)
        .bind(
            entry
                .file_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        )
        .bind(entry.success)
        .bind(entry.timestamp)
        .bind(&entry.format)
        .bind(&entry.error_message)
        .execute(&self.pool)
        .await?;

        debug!("Saved history entry: {}", entry.id);
        Ok(())
    }

    /// Newest `limit` entries, newest first
    pub async fn last(&self, limit: u32) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query("SELECT * FROM history ORDER BY timestamp DESC, rowid DESC LIMIT ?")
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(row_into_history_entry(row)?);
        }
        Ok(entries)
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM history")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }
}

fn row_into_history_entry(row: sqlx::sqlite::SqliteRow) -> Result<HistoryEntry> {
    Ok(HistoryEntry {
        id: row.try_get("id")?,
        url: row.try_get("url")?,
        file_path: row
            .try_get::<Option<String>, _>("file_path")?
            .map(PathBuf::from),
        success: row.try_get("success")?,
        timestamp: row.try_get("timestamp")?,
        format: row.try_get("format")?,
        error_message: row.try_get("error_message")?,
    })
}
