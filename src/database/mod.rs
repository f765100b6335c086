//! Download history database

pub mod operations;
pub mod schema;

pub use operations::{DownloadHistory, HistoryEntry};
pub use schema::{initialize_database, HISTORY_DB_FILE};
