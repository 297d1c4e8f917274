// Students service
// Student list (filter + sort over one snapshot) and the student profile with
// its optimistic writes. Every profile write is staged in the local cache,
// sent to the store once, and then confirmed or reverted. No retries.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{PendingId, RecordCache};
use crate::db::DbError;
use crate::error::{DeskError, Notice};
use crate::filter::{country_options, SortState, StudentFilter};
use crate::progress::status_to_progress;
use crate::store::RecordStore;
use crate::templates::{
    build_summary, compose_outbound, OutreachInput, Picker, Summary, SummaryInput,
};
use crate::types::{
    AppStatus, Channel, Communication, Config, Direction, Interaction, NewCommunication, NewNote,
    NewTask, Note, Student, StudentPatch, Task, TaskStatus,
};

/// Subject recorded for communications logged by hand on the email channel.
pub const MANUAL_EMAIL_SUBJECT: &str = "Follow-up";

fn pending_key() -> String {
    format!("pending-{}", uuid::Uuid::new_v4())
}

// =============================================================================
// Student list
// =============================================================================

pub struct StudentList {
    records: Vec<Student>,
    pub filter: StudentFilter,
    pub sort: SortState,
}

impl StudentList {
    /// Fetch the list snapshot and apply navigation state (`qf=`). The
    /// snapshot always covers the dashboard's, so a counter's click-through
    /// finds every student it counted.
    pub fn load(
        store: &dyn RecordStore,
        config: &Config,
        nav_query: &str,
    ) -> Result<Self, DeskError> {
        let records = store
            .list_students(config.list_snapshot_limit())
            .map_err(|e| DeskError::load("students", e))?;
        Ok(Self::from_records(
            records,
            StudentFilter::from_query_string(nav_query),
        ))
    }

    pub fn from_records(records: Vec<Student>, filter: StudentFilter) -> Self {
        let mut sort = SortState::default();
        sort.ensure_default(records.len());
        StudentList {
            records,
            filter,
            sort,
        }
    }

    pub fn records(&self) -> &[Student] {
        &self.records
    }

    /// Filtered rows in display order.
    pub fn rows(&self, now: DateTime<Utc>) -> Vec<&Student> {
        let mut rows = self.filter.apply(&self.records, now);
        self.sort.sort_rows(&mut rows);
        rows
    }

    pub fn country_options(&self) -> Vec<String> {
        country_options(&self.records)
    }
}

// =============================================================================
// Student profile
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSnapshot {
    pub student: Student,
    pub progress: u8,
    pub interactions: Vec<Interaction>,
    pub communications: Vec<Communication>,
    pub notes: Vec<Note>,
    pub tasks: Vec<Task>,
}

pub struct StudentProfile {
    student_id: String,
    /// Single-record cache so status and last-contact writes share the overlay.
    student: RecordCache<Student>,
    loaded: Student,
    interactions: RecordCache<Interaction>,
    communications: RecordCache<Communication>,
    notes: RecordCache<Note>,
    tasks: RecordCache<Task>,
    author_id: String,
    summary_interaction_limit: usize,
}

/// Resolve one staged write against the store's answer.
fn settle<T, R>(
    cache: &mut RecordCache<T>,
    pending: PendingId,
    result: Result<R, DbError>,
    stored: impl FnOnce(R) -> Option<T>,
    action: &'static str,
    success: &str,
) -> Notice
where
    T: crate::cache::Keyed + Clone,
{
    match result {
        Ok(value) => {
            cache.confirm(pending, stored(value));
            Notice::success(success)
        }
        Err(e) => {
            cache.revert(pending);
            let err = DeskError::write(action, e);
            log::warn!("{}", err);
            Notice::from(&err)
        }
    }
}

impl StudentProfile {
    /// Load a student and its four sub-collections. A missing student is
    /// `NotFound`; the caller shows the empty state.
    pub fn load(store: &dyn RecordStore, config: &Config, id: &str) -> Result<Self, DeskError> {
        let student = store
            .get_student(id)
            .map_err(|e| DeskError::load("student", e))?
            .ok_or_else(|| DeskError::not_found("Student"))?;

        let failed = |what: &'static str| move |e: DbError| DeskError::load(what, e);
        let interactions = store.list_interactions(id).map_err(failed("interactions"))?;
        let communications = store
            .list_communications(id)
            .map_err(failed("communications"))?;
        let notes = store.list_notes(id).map_err(failed("notes"))?;
        let tasks = store.list_tasks(id).map_err(failed("tasks"))?;

        Ok(StudentProfile {
            student_id: student.id.clone(),
            student: RecordCache::new(vec![student.clone()]),
            loaded: student,
            interactions: RecordCache::new(interactions),
            communications: RecordCache::new(communications),
            notes: RecordCache::new(notes),
            tasks: RecordCache::new(tasks),
            author_id: config.author_id.clone(),
            summary_interaction_limit: config.summary_interaction_limit,
        })
    }

    pub fn student(&self) -> Student {
        self.student
            .get(&self.student_id)
            .unwrap_or_else(|| self.loaded.clone())
    }

    pub fn progress(&self) -> u8 {
        status_to_progress(self.student().status)
    }

    pub fn interactions(&self) -> Vec<Interaction> {
        self.interactions.visible()
    }

    pub fn communications(&self) -> Vec<Communication> {
        self.communications.visible()
    }

    pub fn notes(&self) -> Vec<Note> {
        self.notes.visible()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.visible()
    }

    pub fn snapshot(&self) -> ProfileSnapshot {
        let student = self.student();
        ProfileSnapshot {
            progress: status_to_progress(student.status),
            student,
            interactions: self.interactions(),
            communications: self.communications(),
            notes: self.notes(),
            tasks: self.tasks(),
        }
    }

    // -------------------------------------------------------------------------
    // Student fields
    // -------------------------------------------------------------------------

    pub fn update_status(&mut self, store: &dyn RecordStore, status: AppStatus) -> Notice {
        self.patch_student(
            store,
            StudentPatch {
                status: Some(status),
                ..Default::default()
            },
            "update status",
            "Status updated",
        )
    }

    fn patch_student(
        &mut self,
        store: &dyn RecordStore,
        patch: StudentPatch,
        action: &'static str,
        success: &str,
    ) -> Notice {
        let mut next = self.student();
        patch.apply_to(&mut next);
        let pending = self.student.stage_update(next.clone());
        let result = store.update_student(&self.student_id, &patch);
        settle(
            &mut self.student,
            pending,
            result,
            |_| Some(next),
            action,
            success,
        )
    }

    // -------------------------------------------------------------------------
    // Communications
    // -------------------------------------------------------------------------

    /// Log a hand-written communication. Blank bodies are ignored.
    pub fn log_communication(
        &mut self,
        store: &dyn RecordStore,
        channel: Channel,
        body: &str,
        now: DateTime<Utc>,
    ) -> Notice {
        let body = body.trim();
        if body.is_empty() {
            return Notice::ignored("Nothing to log");
        }
        let subject = (channel == Channel::Email).then(|| MANUAL_EMAIL_SUBJECT.to_string());
        self.record_communication(
            store,
            channel,
            subject,
            body.to_string(),
            now,
            "log communication",
            "Communication logged",
        )
    }

    /// Log a templated follow-up email tailored to the student's stage and tags.
    pub fn send_follow_up(
        &mut self,
        store: &dyn RecordStore,
        picker: &mut Picker,
        now: DateTime<Utc>,
    ) -> Notice {
        let student = self.student();
        let message = compose_outbound(
            &OutreachInput {
                name: Some(student.name.as_str()),
                channel: Channel::Email,
                status: Some(student.status),
                tags: &student.tags,
            },
            picker,
        );
        self.record_communication(
            store,
            Channel::Email,
            Some(message.subject),
            message.body,
            now,
            "log follow-up",
            "Follow-up email logged",
        )
    }

    /// Append a communication and mirror its time onto `last_communication_at`.
    #[allow(clippy::too_many_arguments)]
    fn record_communication(
        &mut self,
        store: &dyn RecordStore,
        channel: Channel,
        subject: Option<String>,
        body: String,
        now: DateTime<Utc>,
        action: &'static str,
        success: &str,
    ) -> Notice {
        let new = NewCommunication {
            channel,
            direction: Direction::Outbound,
            subject,
            body,
            timestamp: Some(now),
            author_id: Some(self.author_id.clone()),
        };
        let pending = self.communications.stage_insert(Communication {
            id: pending_key(),
            student_id: self.student_id.clone(),
            channel: new.channel,
            direction: new.direction,
            subject: new.subject.clone(),
            body: new.body.clone(),
            timestamp: new.timestamp,
            author_id: new.author_id.clone(),
        });

        let result = store.create_communication(&self.student_id, &new);
        let mut logged_at = None;
        let notice = settle(
            &mut self.communications,
            pending,
            result,
            |stored| {
                logged_at = stored.timestamp;
                Some(stored)
            },
            action,
            success,
        );
        if !notice.is_success() {
            return notice;
        }

        let mirror = self.patch_student(
            store,
            StudentPatch {
                last_communication_at: Some(logged_at.unwrap_or(now)),
                ..Default::default()
            },
            "update last contact",
            success,
        );
        if !mirror.is_success() {
            log::warn!("Communication saved but last contact not mirrored");
        }
        mirror
    }

    // -------------------------------------------------------------------------
    // Notes
    // -------------------------------------------------------------------------

    pub fn add_note(&mut self, store: &dyn RecordStore, text: &str, now: DateTime<Utc>) -> Notice {
        let text = text.trim();
        if text.is_empty() {
            return Notice::ignored("Note is empty");
        }
        let new = NewNote {
            text: text.to_string(),
            author_id: Some(self.author_id.clone()),
            created_at: Some(now),
        };
        let pending = self.notes.stage_insert(Note {
            id: pending_key(),
            student_id: self.student_id.clone(),
            text: new.text.clone(),
            author_id: new.author_id.clone(),
            created_at: Some(now),
            updated_at: Some(now),
        });
        let result = store.create_note(&self.student_id, &new);
        settle(&mut self.notes, pending, result, Some, "add note", "Note added")
    }

    pub fn edit_note(
        &mut self,
        store: &dyn RecordStore,
        note_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Notice {
        let text = text.trim();
        if text.is_empty() {
            return Notice::ignored("Note is empty");
        }
        let Some(mut note) = self.notes.get(note_id) else {
            return Notice::ignored("Note no longer exists");
        };
        note.text = text.to_string();
        note.updated_at = Some(now);

        let pending = self.notes.stage_update(note.clone());
        let result = store.update_note(&self.student_id, note_id, text);
        settle(
            &mut self.notes,
            pending,
            result,
            |_| Some(note),
            "update note",
            "Note updated",
        )
    }

    pub fn delete_note(&mut self, store: &dyn RecordStore, note_id: &str) -> Notice {
        if self.notes.get(note_id).is_none() {
            return Notice::ignored("Note no longer exists");
        }
        let pending = self.notes.stage_remove(note_id);
        let result = store.delete_note(&self.student_id, note_id);
        settle(
            &mut self.notes,
            pending,
            result,
            |_| None,
            "delete note",
            "Note deleted",
        )
    }

    // -------------------------------------------------------------------------
    // Tasks
    // -------------------------------------------------------------------------

    pub fn add_task(&mut self, store: &dyn RecordStore, title: &str, now: DateTime<Utc>) -> Notice {
        let title = title.trim();
        if title.is_empty() {
            return Notice::ignored("Task title is empty");
        }
        let new = NewTask {
            title: title.to_string(),
            ..Default::default()
        };
        let pending = self.tasks.stage_insert(Task {
            id: pending_key(),
            student_id: self.student_id.clone(),
            title: new.title.clone(),
            status: TaskStatus::Todo,
            due_at: None,
            assigned_to: None,
            created_at: Some(now),
        });
        let result = store.create_task(&self.student_id, &new);
        settle(&mut self.tasks, pending, result, Some, "create task", "Task created")
    }

    pub fn toggle_task(&mut self, store: &dyn RecordStore, task_id: &str) -> Notice {
        let Some(mut task) = self.tasks.get(task_id) else {
            return Notice::ignored("Task no longer exists");
        };
        task.status = task.status.toggled();
        let next = task.status;

        let pending = self.tasks.stage_update(task.clone());
        let result = store.update_task_status(&self.student_id, task_id, next);
        let success = match next {
            TaskStatus::Done => "Task completed",
            TaskStatus::Todo => "Task reopened",
        };
        settle(
            &mut self.tasks,
            pending,
            result,
            |_| Some(task),
            "update task",
            success,
        )
    }

    pub fn delete_task(&mut self, store: &dyn RecordStore, task_id: &str) -> Notice {
        if self.tasks.get(task_id).is_none() {
            return Notice::ignored("Task no longer exists");
        }
        let pending = self.tasks.stage_remove(task_id);
        let result = store.delete_task(&self.student_id, task_id);
        settle(
            &mut self.tasks,
            pending,
            result,
            |_| None,
            "delete task",
            "Task deleted",
        )
    }

    // -------------------------------------------------------------------------
    // Summary
    // -------------------------------------------------------------------------

    /// Advisor brief from the loaded profile. Uses the latest logged
    /// communication for "last contact" when there is one.
    pub fn generate_summary(&self, picker: &mut Picker, now: DateTime<Utc>) -> Summary {
        let student = self.student();
        let interactions = self.interactions();
        let latest_contact = self
            .communications
            .visible()
            .first()
            .and_then(|c| c.timestamp);
        let input = SummaryInput::from_profile(
            &student,
            &interactions,
            latest_contact,
            self.summary_interaction_limit,
        );
        build_summary(&input, now, picker)
    }
}
