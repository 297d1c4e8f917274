use chrono::{DateTime, Utc};
use rusqlite::params;

use super::*;

/// A row from the `advisors` table.
#[derive(Debug, Clone)]
pub struct DbAdvisor {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub password_salt: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl DeskDb {
    // =========================================================================
    // Advisors + sessions
    // =========================================================================

    pub fn insert_advisor(&self, advisor: &DbAdvisor) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO advisors (id, email, display_name, password_salt, password_hash, created_at)
             VALUES (?1, LOWER(?2), ?3, ?4, ?5, ?6)",
            params![
                advisor.id,
                advisor.email.trim(),
                advisor.display_name,
                advisor.password_salt,
                advisor.password_hash,
                ts_to_sql(&advisor.created_at),
            ],
        )?;
        Ok(())
    }

    /// Look up an advisor by email (case-insensitive).
    pub fn get_advisor_by_email(&self, email: &str) -> Result<Option<DbAdvisor>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, display_name, password_salt, password_hash, created_at
             FROM advisors WHERE email = LOWER(?1)",
        )?;
        let mut rows = stmt.query_map(params![email.trim()], Self::map_advisor_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn insert_session(&self, token: &str, advisor_id: &str) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO sessions (token, advisor_id, created_at) VALUES (?1, ?2, ?3)",
            params![token, advisor_id, ts_to_sql(&Utc::now())],
        )?;
        Ok(())
    }

    /// Resolve a session token to its advisor, if the session is still live.
    pub fn get_session_advisor(&self, token: &str) -> Result<Option<DbAdvisor>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.email, a.display_name, a.password_salt, a.password_hash, a.created_at
             FROM sessions s
             JOIN advisors a ON a.id = s.advisor_id
             WHERE s.token = ?1",
        )?;
        let mut rows = stmt.query_map(params![token], Self::map_advisor_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn delete_session(&self, token: &str) -> Result<(), DbError> {
        self.conn
            .execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(())
    }

    fn map_advisor_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DbAdvisor> {
        Ok(DbAdvisor {
            id: row.get(0)?,
            email: row.get(1)?,
            display_name: row.get(2)?,
            password_salt: row.get(3)?,
            password_hash: row.get(4)?,
            created_at: ts_from_sql(row.get(5)?).unwrap_or_else(DateTime::<Utc>::default),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;

    fn advisor(email: &str) -> DbAdvisor {
        DbAdvisor {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            display_name: Some("Dana".into()),
            password_salt: "salt".into(),
            password_hash: "hash".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_advisor_lookup_is_case_insensitive() {
        let db = test_db();
        let a = advisor("Dana@School.org");
        db.insert_advisor(&a).expect("insert");
        let found = db
            .get_advisor_by_email("dana@school.ORG")
            .expect("query")
            .expect("found");
        assert_eq!(found.id, a.id);
        assert_eq!(found.email, "dana@school.org");
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let db = test_db();
        db.insert_advisor(&advisor("dup@x.org")).expect("first");
        assert!(db.insert_advisor(&advisor("DUP@x.org")).is_err());
    }

    #[test]
    fn test_session_lifecycle() {
        let db = test_db();
        let a = advisor("s@x.org");
        db.insert_advisor(&a).expect("insert");
        db.insert_session("tok-1", &a.id).expect("session");
        assert_eq!(
            db.get_session_advisor("tok-1").expect("query").map(|x| x.id),
            Some(a.id.clone())
        );
        db.delete_session("tok-1").expect("delete");
        assert!(db.get_session_advisor("tok-1").expect("query").is_none());
    }
}
