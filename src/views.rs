//! Display rows for the per-student sub-record timelines.
//!
//! Rows are plain serializable values; the CLI prints them line by line and
//! `--json` emits them unchanged.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;
use std::fmt::Display;

use crate::types::{Communication, Interaction, InteractionKind, Note, Student, Task, TaskStatus};
use crate::util::{capitalize, format_timestamp};

pub const NO_INTERACTIONS: &str = "No interactions yet.";
pub const NO_COMMUNICATIONS: &str = "No communications logged.";
pub const NO_NOTES: &str = "No notes yet.";
pub const NO_TASKS: &str = "No tasks yet.";

/// A note counts as edited once its update time moves past creation by more
/// than this.
const EDIT_GRACE_SECONDS: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRow {
    pub id: String,
    pub label: String,
    pub detail: Option<String>,
    pub when: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationRow {
    pub id: String,
    pub header: String,
    pub body: String,
    pub when: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRow {
    pub id: String,
    pub text: String,
    pub edited: bool,
    pub when: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRow {
    pub id: String,
    pub done: bool,
    pub title: String,
    pub when: String,
}

/// "ai_question" → "Ai Question".
pub fn interaction_label(kind: InteractionKind) -> String {
    kind.as_str()
        .split('_')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// "EMAIL • Follow-up", or just "SMS" without a subject.
pub fn communication_header(comm: &Communication) -> String {
    let channel = comm.channel.as_str().to_uppercase();
    match comm.subject.as_deref().filter(|s| !s.is_empty()) {
        Some(subject) => format!("{} • {}", channel, subject),
        None => channel,
    }
}

fn note_edited(note: &Note) -> bool {
    match (note.created_at, note.updated_at) {
        (Some(created), Some(updated)) => {
            updated - created > Duration::seconds(EDIT_GRACE_SECONDS)
        }
        _ => false,
    }
}

/// Row builders, parameterised by the display time zone.
pub struct Timeline<'z, Tz: TimeZone> {
    tz: &'z Tz,
}

impl<'z, Tz> Timeline<'z, Tz>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    pub fn new(tz: &'z Tz) -> Self {
        Self { tz }
    }

    fn when(&self, ts: Option<&DateTime<Utc>>) -> String {
        format_timestamp(ts, self.tz)
    }

    pub fn interactions(&self, items: &[Interaction]) -> Vec<InteractionRow> {
        items
            .iter()
            .map(|it| InteractionRow {
                id: it.id.clone(),
                label: interaction_label(it.kind),
                detail: it.detail.clone().filter(|d| !d.is_empty()),
                when: self.when(it.timestamp.as_ref()),
            })
            .collect()
    }

    pub fn communications(&self, items: &[Communication]) -> Vec<CommunicationRow> {
        items
            .iter()
            .map(|c| CommunicationRow {
                id: c.id.clone(),
                header: communication_header(c),
                body: c.body.clone(),
                when: self.when(c.timestamp.as_ref()),
            })
            .collect()
    }

    pub fn notes(&self, items: &[Note]) -> Vec<NoteRow> {
        items
            .iter()
            .map(|n| NoteRow {
                id: n.id.clone(),
                text: n.text.clone(),
                edited: note_edited(n),
                when: self.when(n.created_at.as_ref()),
            })
            .collect()
    }

    pub fn tasks(&self, items: &[Task]) -> Vec<TaskRow> {
        items
            .iter()
            .map(|t| TaskRow {
                id: t.id.clone(),
                done: t.status == TaskStatus::Done,
                title: t.title.clone(),
                when: self.when(t.created_at.as_ref()),
            })
            .collect()
    }
}

/// "email • country • Grade 11" subtitle under the student's name.
pub fn profile_subtitle(student: &Student) -> String {
    let mut parts = vec![student.email.clone()];
    if !student.country.is_empty() {
        parts.push(student.country.clone());
    }
    if let Some(grade) = student.grade.as_deref().filter(|g| !g.is_empty()) {
        parts.push(format!("Grade {}", grade));
    }
    parts.join(" • ")
}

// =============================================================================
// Text rendering
// =============================================================================

fn render_section<T>(rows: &[T], placeholder: &str, line: impl Fn(&T) -> String) -> Vec<String> {
    if rows.is_empty() {
        vec![placeholder.to_string()]
    } else {
        rows.iter().map(line).collect()
    }
}

pub fn render_interactions(rows: &[InteractionRow]) -> Vec<String> {
    render_section(rows, NO_INTERACTIONS, |r| match r.detail {
        Some(ref detail) => format!("{}  {}\n    {}", r.when, r.label, detail),
        None => format!("{}  {}", r.when, r.label),
    })
}

pub fn render_communications(rows: &[CommunicationRow]) -> Vec<String> {
    render_section(rows, NO_COMMUNICATIONS, |r| {
        format!("{}  {}\n    {}", r.when, r.header, r.body)
    })
}

pub fn render_notes(rows: &[NoteRow]) -> Vec<String> {
    render_section(rows, NO_NOTES, |r| {
        let marker = if r.edited { " (edited)" } else { "" };
        format!("[{}] {}{}\n    {}", r.id, r.when, marker, r.text)
    })
}

pub fn render_tasks(rows: &[TaskRow]) -> Vec<String> {
    render_section(rows, NO_TASKS, |r| {
        let check = if r.done { "[x]" } else { "[ ]" };
        format!("{} {}  ({}, {})", check, r.title, r.id, r.when)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::student;
    use crate::types::{AppStatus, Channel, Direction};

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, h, 4, 5)
            .single()
            .unwrap_or_default()
    }

    fn comm(subject: Option<&str>) -> Communication {
        Communication {
            id: "c1".into(),
            student_id: "s".into(),
            channel: Channel::Email,
            direction: Direction::Outbound,
            subject: subject.map(str::to_string),
            body: "Hi".into(),
            timestamp: Some(at(15)),
            author_id: None,
        }
    }

    #[test]
    fn test_interaction_labels() {
        assert_eq!(interaction_label(InteractionKind::AiQuestion), "Ai Question");
        assert_eq!(interaction_label(InteractionKind::DocUpload), "Doc Upload");
        assert_eq!(interaction_label(InteractionKind::Login), "Login");
    }

    #[test]
    fn test_communication_header() {
        assert_eq!(communication_header(&comm(Some("Follow-up"))), "EMAIL • Follow-up");
        assert_eq!(communication_header(&comm(None)), "EMAIL");
    }

    #[test]
    fn test_rows_format_timestamps_or_dash() {
        let timeline = Timeline::new(&Utc);
        let rows = timeline.communications(&[comm(None)]);
        assert_eq!(rows[0].when, "Oct 16, 2026, 3:04:05 PM");

        let it = Interaction {
            id: "i".into(),
            student_id: "s".into(),
            kind: InteractionKind::Login,
            detail: Some(String::new()),
            timestamp: None,
        };
        let rows = timeline.interactions(&[it]);
        assert_eq!(rows[0].when, "—");
        assert_eq!(rows[0].detail, None);
    }

    #[test]
    fn test_note_edited_marker() {
        let timeline = Timeline::new(&Utc);
        let mut note = Note {
            id: "n".into(),
            student_id: "s".into(),
            text: "hello".into(),
            author_id: None,
            created_at: Some(at(9)),
            updated_at: Some(at(9)),
        };
        assert!(!timeline.notes(std::slice::from_ref(&note))[0].edited);
        note.updated_at = Some(at(10));
        assert!(timeline.notes(&[note])[0].edited);
    }

    #[test]
    fn test_empty_sections_render_placeholders() {
        assert_eq!(render_interactions(&[]), vec![NO_INTERACTIONS]);
        assert_eq!(render_communications(&[]), vec![NO_COMMUNICATIONS]);
        assert_eq!(render_notes(&[]), vec![NO_NOTES]);
        assert_eq!(render_tasks(&[]), vec![NO_TASKS]);
    }

    #[test]
    fn test_task_rows() {
        let timeline = Timeline::new(&Utc);
        let task = Task {
            id: "t".into(),
            student_id: "s".into(),
            title: "Reminder: Essay outline".into(),
            status: TaskStatus::Done,
            due_at: None,
            assigned_to: None,
            created_at: None,
        };
        let rows = timeline.tasks(&[task]);
        assert!(rows[0].done);
        assert_eq!(render_tasks(&rows), vec!["[x] Reminder: Essay outline  (t, —)"]);
    }

    #[test]
    fn test_profile_subtitle() {
        let now = Utc::now();
        let mut s = student("a", AppStatus::Exploring, now);
        assert_eq!(profile_subtitle(&s), "a@example.com • Kenya");
        s.grade = Some("11".into());
        assert_eq!(profile_subtitle(&s), "a@example.com • Kenya • Grade 11");
    }
}
