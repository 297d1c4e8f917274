//! Embedded schema for the desk database.
//!
//! `schema_version` records which steps have run. Opening a database brings
//! it up to the newest step, then checks that `students` still carries every
//! column the row mapper selects, so a hand-edited file fails at open rather
//! than on the first list.

use std::collections::HashSet;

use rusqlite::{Connection, DatabaseName};

use crate::db::students::STUDENT_COLUMNS;

/// `(version, name, sql)`, ascending by version.
const STEPS: &[(i32, &str, &str)] = &[
    (1, "baseline", include_str!("migrations/001_baseline.sql")),
    (
        2,
        "parent_immutable",
        include_str!("migrations/002_parent_immutable.sql"),
    ),
];

fn latest_version() -> i32 {
    STEPS.last().map(|(version, _, _)| *version).unwrap_or(0)
}

fn applied_version(conn: &Connection) -> Result<i32, String> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| format!("Failed to create schema_version table: {}", e))?;

    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| format!("Failed to read schema version: {}", e))
}

/// Copy an on-disk database to `<path>.v<from>.bak` before upgrading it.
fn snapshot(conn: &Connection, from: i32) -> Result<(), String> {
    let Some(path) = conn.path().filter(|p| !p.is_empty()) else {
        return Ok(());
    };
    let target = format!("{}.v{}.bak", path, from);
    conn.backup(DatabaseName::Main, &target, None)
        .map_err(|e| format!("Backup before upgrading from v{} failed: {}", from, e))?;
    log::info!("Saved schema v{} copy to {}", from, target);
    Ok(())
}

fn apply_step(conn: &Connection, version: i32, name: &str, sql: &str) -> Result<(), String> {
    let failed = |e: rusqlite::Error| format!("Migration v{} ({}) failed: {}", version, name, e);
    let tx = conn.unchecked_transaction().map_err(failed)?;
    tx.execute_batch(sql).map_err(failed)?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(failed)?;
    tx.commit().map_err(failed)?;
    log::info!("Applied migration v{} ({})", version, name);
    Ok(())
}

/// Columns the student row mapper reads that the table does not have.
fn missing_student_columns(conn: &Connection) -> Result<Vec<&'static str>, String> {
    let read = |e: rusqlite::Error| format!("Failed to inspect students table: {}", e);
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info('students')")
        .map_err(read)?;
    let present = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(read)?
        .collect::<Result<HashSet<_>, _>>()
        .map_err(read)?;

    Ok(STUDENT_COLUMNS
        .split(',')
        .map(str::trim)
        .filter(|column| !present.contains(*column))
        .collect())
}

/// Bring the schema up to date. Returns how many steps ran.
///
/// A database from a newer build is left untouched.
pub fn run_migrations(conn: &Connection) -> Result<usize, String> {
    let current = applied_version(conn)?;
    let latest = latest_version();
    if current > latest {
        return Err(format!(
            "Database schema v{} is newer than this build of StudentDesk understands (v{}). \
             Please update StudentDesk.",
            current, latest
        ));
    }

    let pending: Vec<_> = STEPS.iter().filter(|(v, _, _)| *v > current).collect();
    if !pending.is_empty() && current > 0 {
        snapshot(conn, current)?;
    }
    for (version, name, sql) in &pending {
        apply_step(conn, *version, name, sql)?;
    }

    let missing = missing_student_columns(conn)?;
    if !missing.is_empty() {
        return Err(format!(
            "students table is missing column(s): {}",
            missing.join(", ")
        ));
    }
    Ok(pending.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migrated() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        run_migrations(&conn).expect("migrations should succeed");
        conn
    }

    #[test]
    fn test_fresh_db_applies_every_step() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        assert_eq!(run_migrations(&conn).expect("migrate"), STEPS.len());
        assert_eq!(applied_version(&conn).expect("version"), latest_version());

        for table in ["students", "interactions", "communications", "notes", "tasks", "advisors", "sessions"] {
            let count: i32 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                .unwrap_or_else(|_| panic!("{} table should exist", table));
            assert_eq!(count, 0);
        }
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = migrated();
        assert_eq!(run_migrations(&conn).expect("second run"), 0);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let conn = migrated();
        conn.execute("INSERT INTO schema_version (version) VALUES (99)", [])
            .expect("insert future version");
        let err = run_migrations(&conn).expect_err("should refuse newer schema");
        assert!(err.contains("newer"), "unexpected error: {}", err);
    }

    #[test]
    fn test_sub_records_keep_their_student() {
        let conn = migrated();
        conn.execute_batch(
            "INSERT INTO students (id, name, email, country, status, created_at, updated_at)
                 VALUES ('s1', 'Ana', 'ana@x.org', 'Peru', 'Exploring', 'now', 'now'),
                        ('s2', 'Ben', 'ben@x.org', 'Peru', 'Exploring', 'now', 'now');
             INSERT INTO notes (id, student_id, text, author_id, created_at, updated_at)
                 VALUES ('n1', 's1', 'first call', 'admin-demo', 'now', 'now');
             INSERT INTO tasks (id, student_id, title, status, created_at, updated_at)
                 VALUES ('t1', 's1', 'Send list', 'todo', 'now', 'now');",
        )
        .expect("seed rows");

        let moved = conn.execute("UPDATE notes SET student_id = 's2' WHERE id = 'n1'", []);
        let err = moved.expect_err("note must stay with its student").to_string();
        assert!(err.contains("cannot change"), "unexpected error: {}", err);
        assert!(conn
            .execute("UPDATE tasks SET student_id = 's2' WHERE id = 't1'", [])
            .is_err());

        conn.execute("UPDATE notes SET text = 'edited' WHERE id = 'n1'", [])
            .expect("other columns stay writable");
        conn.execute("UPDATE notes SET student_id = 's1' WHERE id = 'n1'", [])
            .expect("same parent is not a move");
    }

    #[test]
    fn test_students_table_missing_a_mapped_column_is_rejected() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        run_migrations(&conn).expect("migrate");
        conn.execute_batch("ALTER TABLE students DROP COLUMN tags;")
            .expect("drop column");

        let err = run_migrations(&conn).expect_err("mapper column is gone");
        assert!(err.contains("tags"), "unexpected error: {}", err);
    }

    #[test]
    fn test_upgrade_keeps_a_copy_of_the_old_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("desk.db");
        {
            let conn = Connection::open(&path).expect("open");
            run_migrations(&conn).expect("migrate");
            conn.execute("DELETE FROM schema_version WHERE version = 2", [])
                .expect("roll back bookkeeping");
        }

        let conn = Connection::open(&path).expect("reopen");
        assert_eq!(run_migrations(&conn).expect("upgrade"), 1);
        assert!(dir.path().join("desk.db.v1.bak").exists());
    }
}
