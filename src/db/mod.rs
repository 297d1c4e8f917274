//! SQLite-backed record store for students and their sub-collections.
//!
//! The database lives at `~/.studentdesk/studentdesk.db` unless the config or
//! `STUDENTDESK_DB` points elsewhere. Students form the top-level collection;
//! interactions, communications, notes and tasks are keyed by `student_id`.

use std::path::{Path, PathBuf};

use rusqlite::Connection;

pub mod advisors;
pub mod records;
pub mod students;
pub mod types;
pub use advisors::DbAdvisor;
pub use types::*;

pub struct DeskDb {
    conn: Connection,
}

impl DeskDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Self) -> Result<T, DbError>,
    {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(val) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) the database at the default path and apply the schema.
    pub fn open() -> Result<Self, DbError> {
        let path = Self::db_path()?;
        Self::open_at(path)
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::prepare(conn)
    }

    /// Open a throwaway in-memory database.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self, DbError> {
        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Resolve the default database path: `~/.studentdesk/studentdesk.db`.
    pub fn db_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".studentdesk").join("studentdesk.db"))
    }

    /// Resolve the path from an optional override, else the default.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, DbError> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::db_path(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_utils::test_db;
    use super::*;

    #[test]
    fn test_open_creates_tables() {
        let db = test_db();
        let count: i32 = db
            .conn
            .query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))
            .expect("students table should exist");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = test_db();
        let result: Result<(), DbError> = db.with_transaction(|tx| {
            tx.conn_ref().execute(
                "INSERT INTO advisors (id, email, password_salt, password_hash, created_at)
                 VALUES ('a1', 'a@x.com', 's', 'h', '2026-01-01T00:00:00Z')",
                [],
            )?;
            Err(DbError::Unavailable("abort".into()))
        });
        assert!(result.is_err());

        let count: i32 = db
            .conn
            .query_row("SELECT COUNT(*) FROM advisors", [], |row| row.get(0))
            .expect("count advisors");
        assert_eq!(count, 0, "insert should have been rolled back");
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let db = DeskDb::open_in_memory().expect("in-memory db");
        let result = db.conn_ref().execute(
            "INSERT INTO notes (id, student_id, text) VALUES ('n1', 'missing', 'x')",
            [],
        );
        assert!(result.is_err(), "orphan note should violate FK");
    }
}
