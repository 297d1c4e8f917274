//! Per-student sub-collections: interactions, communications, notes, tasks.
//!
//! Every list is returned newest first. Writes against a student that does not
//! exist fail with `DbError::NotFound`; the parent id of a sub-record is never
//! updated after insert.

use chrono::Utc;
use rusqlite::params;

use super::*;
use crate::types::{
    Channel, Communication, Direction, Interaction, InteractionKind, NewCommunication,
    NewInteraction, NewNote, NewTask, Note, Task, TaskStatus,
};

impl DeskDb {
    fn require_student(&self, student_id: &str) -> Result<(), DbError> {
        if self.student_exists(student_id)? {
            Ok(())
        } else {
            Err(DbError::NotFound {
                collection: "student",
                id: student_id.to_string(),
            })
        }
    }

    // =========================================================================
    // Interactions
    // =========================================================================

    pub fn list_interactions(&self, student_id: &str) -> Result<Vec<Interaction>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, student_id, kind, detail, timestamp
             FROM interactions
             WHERE student_id = ?1
             ORDER BY timestamp IS NULL, timestamp DESC, id",
        )?;
        let rows = stmt.query_map(params![student_id], |row| {
            let kind_raw: String = row.get(2)?;
            Ok((
                kind_raw,
                Interaction {
                    id: row.get(0)?,
                    student_id: row.get(1)?,
                    kind: InteractionKind::Login,
                    detail: row.get(3)?,
                    timestamp: ts_from_sql(row.get(4)?),
                },
            ))
        })?;

        let mut interactions = Vec::new();
        for row in rows {
            let (kind_raw, mut interaction) = row?;
            // Unknown kinds come from newer portal builds; skip rather than fail.
            match kind_raw.parse::<InteractionKind>() {
                Ok(kind) => {
                    interaction.kind = kind;
                    interactions.push(interaction);
                }
                Err(e) => log::debug!("Skipping interaction {}: {}", interaction.id, e),
            }
        }
        Ok(interactions)
    }

    pub fn insert_interaction(
        &self,
        student_id: &str,
        new: &NewInteraction,
    ) -> Result<Interaction, DbError> {
        self.require_student(student_id)?;
        let interaction = Interaction {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            kind: new.kind,
            detail: new.detail.clone(),
            timestamp: Some(new.timestamp.unwrap_or_else(Utc::now)),
        };
        self.conn.execute(
            "INSERT INTO interactions (id, student_id, kind, detail, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                interaction.id,
                interaction.student_id,
                interaction.kind.as_str(),
                interaction.detail,
                opt_ts_to_sql(&interaction.timestamp),
            ],
        )?;
        Ok(interaction)
    }

    // =========================================================================
    // Communications
    // =========================================================================

    pub fn list_communications(&self, student_id: &str) -> Result<Vec<Communication>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, student_id, channel, direction, subject, body, timestamp, author_id
             FROM communications
             WHERE student_id = ?1
             ORDER BY timestamp IS NULL, timestamp DESC, id",
        )?;
        let rows = stmt.query_map(params![student_id], Self::map_communication_row)?;

        let mut comms = Vec::new();
        for row in rows {
            comms.push(row?);
        }
        Ok(comms)
    }

    pub fn insert_communication(
        &self,
        student_id: &str,
        new: &NewCommunication,
    ) -> Result<Communication, DbError> {
        self.require_student(student_id)?;
        let comm = Communication {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            channel: new.channel,
            direction: new.direction,
            subject: new.subject.clone(),
            body: new.body.clone(),
            timestamp: Some(new.timestamp.unwrap_or_else(Utc::now)),
            author_id: new.author_id.clone(),
        };
        self.conn.execute(
            "INSERT INTO communications
                (id, student_id, channel, direction, subject, body, timestamp, author_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                comm.id,
                comm.student_id,
                comm.channel.as_str(),
                comm.direction.as_str(),
                comm.subject,
                comm.body,
                opt_ts_to_sql(&comm.timestamp),
                comm.author_id,
            ],
        )?;
        Ok(comm)
    }

    fn map_communication_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Communication> {
        let channel_raw: String = row.get(2)?;
        let direction_raw: Option<String> = row.get(3)?;
        Ok(Communication {
            id: row.get(0)?,
            student_id: row.get(1)?,
            channel: channel_raw.parse().unwrap_or(Channel::Note),
            direction: match direction_raw.as_deref() {
                Some("inbound") => Direction::Inbound,
                _ => Direction::Outbound,
            },
            subject: row.get(4)?,
            body: row.get(5)?,
            timestamp: ts_from_sql(row.get(6)?),
            author_id: row.get(7)?,
        })
    }

    // =========================================================================
    // Notes
    // =========================================================================

    pub fn list_notes(&self, student_id: &str) -> Result<Vec<Note>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, student_id, text, author_id, created_at, updated_at
             FROM notes
             WHERE student_id = ?1
             ORDER BY created_at IS NULL, created_at DESC, id",
        )?;
        let rows = stmt.query_map(params![student_id], |row| {
            Ok(Note {
                id: row.get(0)?,
                student_id: row.get(1)?,
                text: row.get(2)?,
                author_id: row.get(3)?,
                created_at: ts_from_sql(row.get(4)?),
                updated_at: ts_from_sql(row.get(5)?),
            })
        })?;

        let mut notes = Vec::new();
        for row in rows {
            notes.push(row?);
        }
        Ok(notes)
    }

    pub fn insert_note(&self, student_id: &str, new: &NewNote) -> Result<Note, DbError> {
        self.require_student(student_id)?;
        let created = new.created_at.unwrap_or_else(Utc::now);
        let note = Note {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            text: new.text.clone(),
            author_id: new.author_id.clone(),
            created_at: Some(created),
            updated_at: Some(created),
        };
        self.conn.execute(
            "INSERT INTO notes (id, student_id, text, author_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                note.id,
                note.student_id,
                note.text,
                note.author_id,
                opt_ts_to_sql(&note.created_at),
                opt_ts_to_sql(&note.updated_at),
            ],
        )?;
        Ok(note)
    }

    /// Edit a note in place, bumping `updated_at`.
    pub fn update_note_text(
        &self,
        student_id: &str,
        note_id: &str,
        text: &str,
    ) -> Result<(), DbError> {
        let changed = self.conn.execute(
            "UPDATE notes SET text = ?1, updated_at = ?2 WHERE id = ?3 AND student_id = ?4",
            params![text, ts_to_sql(&Utc::now()), note_id, student_id],
        )?;
        if changed == 0 {
            return Err(DbError::NotFound {
                collection: "note",
                id: note_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn delete_note(&self, student_id: &str, note_id: &str) -> Result<(), DbError> {
        let changed = self.conn.execute(
            "DELETE FROM notes WHERE id = ?1 AND student_id = ?2",
            params![note_id, student_id],
        )?;
        if changed == 0 {
            return Err(DbError::NotFound {
                collection: "note",
                id: note_id.to_string(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub fn list_tasks(&self, student_id: &str) -> Result<Vec<Task>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, student_id, title, status, due_at, assigned_to, created_at
             FROM tasks
             WHERE student_id = ?1
             ORDER BY created_at IS NULL, created_at DESC, id",
        )?;
        let rows = stmt.query_map(params![student_id], |row| {
            let status_raw: Option<String> = row.get(3)?;
            Ok(Task {
                id: row.get(0)?,
                student_id: row.get(1)?,
                title: row.get(2)?,
                status: match status_raw.as_deref() {
                    Some("done") => TaskStatus::Done,
                    _ => TaskStatus::Todo,
                },
                due_at: ts_from_sql(row.get(4)?),
                assigned_to: row.get(5)?,
                created_at: ts_from_sql(row.get(6)?),
            })
        })?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    pub fn insert_task(&self, student_id: &str, new: &NewTask) -> Result<Task, DbError> {
        self.require_student(student_id)?;
        let task = Task {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            title: new.title.clone(),
            status: TaskStatus::Todo,
            due_at: new.due_at,
            assigned_to: new.assigned_to.clone(),
            created_at: Some(Utc::now()),
        };
        self.conn.execute(
            "INSERT INTO tasks (id, student_id, title, status, due_at, assigned_to, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                task.id,
                task.student_id,
                task.title,
                task.status.as_str(),
                opt_ts_to_sql(&task.due_at),
                task.assigned_to,
                opt_ts_to_sql(&task.created_at),
            ],
        )?;
        Ok(task)
    }

    pub fn set_task_status(
        &self,
        student_id: &str,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<(), DbError> {
        let changed = self.conn.execute(
            "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3 AND student_id = ?4",
            params![status.as_str(), ts_to_sql(&Utc::now()), task_id, student_id],
        )?;
        if changed == 0 {
            return Err(DbError::NotFound {
                collection: "task",
                id: task_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn delete_task(&self, student_id: &str, task_id: &str) -> Result<(), DbError> {
        let changed = self.conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND student_id = ?2",
            params![task_id, student_id],
        )?;
        if changed == 0 {
            return Err(DbError::NotFound {
                collection: "task",
                id: task_id.to_string(),
            });
        }
        Ok(())
    }
}
