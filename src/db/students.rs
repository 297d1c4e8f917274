use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};

use super::*;
use crate::types::{AppStatus, NewStudent, Student, StudentPatch};

pub(crate) const STUDENT_COLUMNS: &str = "id, name, email, phone, grade, country, status, last_active,
     last_communication_at, high_intent, needs_essay_help, tags, created_at, updated_at";

fn encode_tags(tags: &[String]) -> Result<String, DbError> {
    serde_json::to_string(tags).map_err(|e| DbError::Encode {
        field: "tags",
        message: e.to_string(),
    })
}

/// Missing or malformed tag JSON reads as an empty set.
fn decode_tags(raw: Option<String>) -> Vec<String> {
    raw.and_then(|json| serde_json::from_str::<Vec<String>>(&json).ok())
        .unwrap_or_default()
}

impl DeskDb {
    // =========================================================================
    // Students
    // =========================================================================

    /// Fetch up to `limit` students, most recently active first. Students
    /// that never logged in sort last.
    pub fn list_students(&self, limit: usize) -> Result<Vec<Student>, DbError> {
        let sql = format!(
            "SELECT {} FROM students \
             ORDER BY last_active IS NULL, last_active DESC, id LIMIT ?1",
            STUDENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], Self::map_student_row)?;

        let mut students = Vec::new();
        for row in rows {
            students.push(row?);
        }
        Ok(students)
    }

    /// Get a single student by id.
    pub fn get_student(&self, id: &str) -> Result<Option<Student>, DbError> {
        let sql = format!("SELECT {} FROM students WHERE id = ?1", STUDENT_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id], Self::map_student_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Insert a new student. The id and bookkeeping timestamps are assigned here.
    pub fn insert_student(&self, new: &NewStudent) -> Result<Student, DbError> {
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();
        let tags = new.tags.clone().unwrap_or_default();

        self.conn.execute(
            "INSERT INTO students (
                id, name, email, phone, grade, country, status, last_active,
                last_communication_at, high_intent, needs_essay_help, tags,
                created_at, updated_at
             ) VALUES (?1, ?2, LOWER(?3), ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
            params![
                id,
                new.name.trim(),
                new.email.trim(),
                new.phone,
                new.grade,
                new.country,
                new.status.unwrap_or(AppStatus::Exploring).as_str(),
                opt_ts_to_sql(&new.last_active),
                opt_ts_to_sql(&new.last_communication_at),
                new.high_intent,
                new.needs_essay_help,
                encode_tags(&tags)?,
                ts_to_sql(&now),
            ],
        )?;

        self.get_student(&id)?.ok_or(DbError::NotFound {
            collection: "student",
            id,
        })
    }

    /// Field-level update. Only the fields set on the patch are written;
    /// `updated_at` is always bumped. Fails with `NotFound` if no row matched.
    pub fn update_student(&self, id: &str, patch: &StudentPatch) -> Result<(), DbError> {
        let mut sets: Vec<&'static str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(status) = patch.status {
            sets.push("status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(ts) = patch.last_active {
            sets.push("last_active = ?");
            values.push(Value::Text(ts_to_sql(&ts)));
        }
        if let Some(ts) = patch.last_communication_at {
            sets.push("last_communication_at = ?");
            values.push(Value::Text(ts_to_sql(&ts)));
        }
        if let Some(flag) = patch.high_intent {
            sets.push("high_intent = ?");
            values.push(Value::Integer(flag as i64));
        }
        if let Some(flag) = patch.needs_essay_help {
            sets.push("needs_essay_help = ?");
            values.push(Value::Integer(flag as i64));
        }
        if let Some(ref tags) = patch.tags {
            sets.push("tags = ?");
            values.push(Value::Text(encode_tags(tags)?));
        }

        sets.push("updated_at = ?");
        values.push(Value::Text(ts_to_sql(&Utc::now())));
        values.push(Value::Text(id.to_string()));

        let sql = format!("UPDATE students SET {} WHERE id = ?", sets.join(", "));
        let changed = self.conn.execute(&sql, params_from_iter(values.iter()))?;
        if changed == 0 {
            return Err(DbError::NotFound {
                collection: "student",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Whether a student row exists. Used to guard sub-record writes.
    pub(crate) fn student_exists(&self, id: &str) -> Result<bool, DbError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM students WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Decode a student row, defaulting every optional field.
    ///
    /// - missing tags → empty
    /// - missing `high_intent` → false
    /// - missing `needs_essay_help` → derived from the `Essay` tag
    /// - unknown status → Exploring
    pub(crate) fn map_student_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Student> {
        let status_raw: String = row.get(6)?;
        let status = status_raw.parse::<AppStatus>().unwrap_or_else(|_| {
            log::debug!("Unknown status {:?}, treating as Exploring", status_raw);
            AppStatus::Exploring
        });
        let tags = decode_tags(row.get(11)?);
        let high_intent: Option<bool> = row.get(9)?;
        let needs_essay_help: Option<bool> = row.get(10)?;
        let needs_essay_help =
            needs_essay_help.unwrap_or_else(|| tags.iter().any(|t| t == "Essay"));

        Ok(Student {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            phone: row.get(3)?,
            grade: row.get(4)?,
            country: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            status,
            last_active: ts_from_sql(row.get(7)?),
            last_communication_at: ts_from_sql(row.get(8)?),
            high_intent: high_intent.unwrap_or(false),
            needs_essay_help,
            tags,
            created_at: ts_from_sql(row.get(12)?).unwrap_or_else(DateTime::<Utc>::default),
            updated_at: ts_from_sql(row.get(13)?).unwrap_or_else(DateTime::<Utc>::default),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;
    use chrono::Duration;

    fn new_student(name: &str, last_active: Option<DateTime<Utc>>) -> NewStudent {
        NewStudent {
            name: name.to_string(),
            email: format!("{}@Example.com", name.to_lowercase().replace(' ', ".")),
            country: "Canada".to_string(),
            status: Some(AppStatus::Shortlisting),
            last_active,
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_and_get_student() {
        let db = test_db();
        let created = db
            .insert_student(&new_student("Maya Chen", Some(Utc::now())))
            .expect("insert");
        assert_eq!(created.email, "maya.chen@example.com");
        assert_eq!(created.status, AppStatus::Shortlisting);

        let fetched = db.get_student(&created.id).expect("get").expect("exists");
        assert_eq!(fetched, created);
        assert!(db.get_student("nope").expect("get missing").is_none());
    }

    #[test]
    fn test_list_orders_by_last_active_desc_and_limits() {
        let db = test_db();
        let now = Utc::now();
        db.insert_student(&new_student("Old", Some(now - Duration::days(10))))
            .expect("insert old");
        db.insert_student(&new_student("Never", None)).expect("insert never");
        db.insert_student(&new_student("Fresh", Some(now))).expect("insert fresh");

        let all = db.list_students(10).expect("list");
        let names: Vec<&str> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Fresh", "Old", "Never"]);

        let limited = db.list_students(2).expect("list");
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_missing_optional_fields_are_defaulted() {
        let db = test_db();
        db.conn_ref()
            .execute(
                "INSERT INTO students (id, name, email, country, status, tags, created_at, updated_at)
                 VALUES ('raw', 'Raw Row', 'raw@x.com', 'Peru', 'Graduated', '[\"Essay\"]',
                         '2026-01-01T00:00:00Z', 'garbage')",
                [],
            )
            .expect("raw insert");

        let s = db.get_student("raw").expect("get").expect("exists");
        assert_eq!(s.status, AppStatus::Exploring);
        assert!(!s.high_intent);
        assert!(s.needs_essay_help, "absent flag derives from Essay tag");
        assert_eq!(s.tags, vec!["Essay".to_string()]);
        assert_eq!(s.updated_at, DateTime::<Utc>::default());
    }

    #[test]
    fn test_update_student_is_field_level() {
        let db = test_db();
        let created = db
            .insert_student(&NewStudent {
                tags: Some(vec!["SAT".into()]),
                high_intent: Some(true),
                ..new_student("Leo Park", Some(Utc::now()))
            })
            .expect("insert");

        let contacted = Utc::now();
        db.update_student(
            &created.id,
            &StudentPatch {
                status: Some(AppStatus::Submitted),
                last_communication_at: Some(contacted),
                ..Default::default()
            },
        )
        .expect("update");

        let s = db.get_student(&created.id).expect("get").expect("exists");
        assert_eq!(s.status, AppStatus::Submitted);
        assert_eq!(s.last_communication_at, Some(contacted));
        assert!(s.high_intent, "untouched flag survives");
        assert_eq!(s.tags, vec!["SAT".to_string()]);
        assert!(s.updated_at >= created.updated_at);
    }

    #[test]
    fn test_update_missing_student_is_not_found() {
        let db = test_db();
        let err = db
            .update_student("ghost", &StudentPatch::default())
            .expect_err("should fail");
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
