use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),

    #[error("{collection} {id} not found")]
    NotFound { collection: &'static str, id: String },

    #[error("Failed to encode {field}: {message}")]
    Encode { field: &'static str, message: String },

    /// The backing store could not be reached. Used by non-SQLite stores.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Timestamps are stored as fixed-width RFC 3339 text so that `ORDER BY`
/// on the raw column is chronological.
pub(crate) fn ts_to_sql(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn opt_ts_to_sql(ts: &Option<DateTime<Utc>>) -> Option<String> {
    ts.as_ref().map(ts_to_sql)
}

/// Lenient timestamp decode: unparseable values read as absent.
pub(crate) fn ts_from_sql(raw: Option<String>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(_) => {
            log::debug!("Ignoring malformed timestamp {:?}", raw);
            None
        }
    }
}
