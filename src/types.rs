use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Configuration
// =============================================================================

/// Application configuration, read from `~/.studentdesk/config.json`.
///
/// Every field has a serde default so an empty `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Explicit database path. Falls back to `~/.studentdesk/studentdesk.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
    /// How many students the dashboard pulls for its counters.
    #[serde(default = "default_dashboard_fetch_limit")]
    pub dashboard_fetch_limit: usize,
    /// How many students the list view pulls before filtering. Never less
    /// than `dashboard_fetch_limit`.
    #[serde(default = "default_list_fetch_limit")]
    pub list_fetch_limit: usize,
    /// How many of the most recent interactions feed the advisor brief.
    #[serde(default = "default_summary_interaction_limit")]
    pub summary_interaction_limit: usize,
    /// Author id stamped on notes and communications.
    #[serde(default = "default_author_id")]
    pub author_id: String,
    /// Enables the seeding commands in release builds.
    #[serde(default)]
    pub developer_mode: bool,
}

fn default_dashboard_fetch_limit() -> usize {
    500
}

fn default_list_fetch_limit() -> usize {
    default_dashboard_fetch_limit()
}

fn default_summary_interaction_limit() -> usize {
    10
}

fn default_author_id() -> String {
    "admin-demo".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            dashboard_fetch_limit: default_dashboard_fetch_limit(),
            list_fetch_limit: default_list_fetch_limit(),
            summary_interaction_limit: default_summary_interaction_limit(),
            author_id: default_author_id(),
            developer_mode: false,
        }
    }
}

impl Config {
    /// Size of the list snapshot. Covers the dashboard snapshot even when a
    /// hand-built config sets a smaller list limit.
    pub fn list_snapshot_limit(&self) -> usize {
        self.list_fetch_limit.max(self.dashboard_fetch_limit)
    }
}

// =============================================================================
// Funnel status
// =============================================================================

/// Application funnel stage. Declaration order is the funnel order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum AppStatus {
    #[default]
    Exploring,
    Shortlisting,
    Applying,
    Submitted,
}

impl AppStatus {
    pub const ALL: [AppStatus; 4] = [
        AppStatus::Exploring,
        AppStatus::Shortlisting,
        AppStatus::Applying,
        AppStatus::Submitted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppStatus::Exploring => "Exploring",
            AppStatus::Shortlisting => "Shortlisting",
            AppStatus::Applying => "Applying",
            AppStatus::Submitted => "Submitted",
        }
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown status: {}", s))
    }
}

// =============================================================================
// Students
// =============================================================================

/// A prospective student as the advisor sees it.
///
/// Optional flags are already defaulted here: readers never see a missing
/// `high_intent` or `tags`, see `db::students` for the decoding rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    pub country: String,
    pub status: AppStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_communication_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub high_intent: bool,
    #[serde(default)]
    pub needs_essay_help: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Fields supplied when creating a student. `created_at`/`updated_at` are
/// assigned by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub grade: Option<String>,
    pub country: String,
    pub status: Option<AppStatus>,
    pub last_active: Option<DateTime<Utc>>,
    pub last_communication_at: Option<DateTime<Utc>>,
    pub high_intent: Option<bool>,
    pub needs_essay_help: Option<bool>,
    pub tags: Option<Vec<String>>,
}

/// Field-level update of a student document. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentPatch {
    pub status: Option<AppStatus>,
    pub last_active: Option<DateTime<Utc>>,
    pub last_communication_at: Option<DateTime<Utc>>,
    pub high_intent: Option<bool>,
    pub needs_essay_help: Option<bool>,
    pub tags: Option<Vec<String>>,
}

impl StudentPatch {
    pub fn is_empty(&self) -> bool {
        *self == StudentPatch::default()
    }

    /// Apply the patch to a local copy, mirroring what the store does.
    pub fn apply_to(&self, student: &mut Student) {
        if let Some(status) = self.status {
            student.status = status;
        }
        if let Some(ts) = self.last_active {
            student.last_active = Some(ts);
        }
        if let Some(ts) = self.last_communication_at {
            student.last_communication_at = Some(ts);
        }
        if let Some(flag) = self.high_intent {
            student.high_intent = flag;
        }
        if let Some(flag) = self.needs_essay_help {
            student.needs_essay_help = flag;
        }
        if let Some(ref tags) = self.tags {
            student.tags = tags.clone();
        }
    }
}

// =============================================================================
// Sub-records
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Login,
    AiQuestion,
    DocUpload,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 3] = [
        InteractionKind::Login,
        InteractionKind::AiQuestion,
        InteractionKind::DocUpload,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Login => "login",
            InteractionKind::AiQuestion => "ai_question",
            InteractionKind::DocUpload => "doc_upload",
        }
    }
}

impl FromStr for InteractionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InteractionKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("Unknown interaction kind: {}", s))
    }
}

/// Student activity captured by the portal. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub id: String,
    pub student_id: String,
    pub kind: InteractionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewInteraction {
    pub kind: InteractionKind,
    pub detail: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    Call,
    Note,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Email, Channel::Sms, Channel::Call, Channel::Note];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Call => "call",
            Channel::Note => "note",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown channel: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Outbound,
    Inbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Outbound => "outbound",
            Direction::Inbound => "inbound",
        }
    }
}

/// A logged email, SMS, call or note. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    pub id: String,
    pub student_id: String,
    pub channel: Channel,
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCommunication {
    pub channel: Channel,
    pub direction: Direction,
    pub subject: Option<String>,
    pub body: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub author_id: Option<String>,
}

/// Internal advisor note. Editable and deletable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub student_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewNote {
    pub text: String,
    pub author_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Todo,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Done => "done",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            TaskStatus::Todo => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::Todo,
        }
    }
}

/// Advisor reminder attached to a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub student_id: String,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub due_at: Option<DateTime<Utc>>,
    pub assigned_to: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_order_follows_funnel() {
        assert!(AppStatus::Exploring < AppStatus::Shortlisting);
        assert!(AppStatus::Shortlisting < AppStatus::Applying);
        assert!(AppStatus::Applying < AppStatus::Submitted);
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("applying".parse::<AppStatus>(), Ok(AppStatus::Applying));
        assert_eq!(" Submitted ".parse::<AppStatus>(), Ok(AppStatus::Submitted));
        assert!("Enrolled".parse::<AppStatus>().is_err());
    }

    #[test]
    fn test_task_status_toggle() {
        assert_eq!(TaskStatus::Todo.toggled(), TaskStatus::Done);
        assert_eq!(TaskStatus::Done.toggled(), TaskStatus::Todo);
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: Config = serde_json::from_str("{}").expect("empty config parses");
        assert_eq!(config.dashboard_fetch_limit, 500);
        assert_eq!(config.list_fetch_limit, 500);
        assert_eq!(config.summary_interaction_limit, 10);
        assert_eq!(config.author_id, "admin-demo");
        assert!(!config.developer_mode);
    }

    #[test]
    fn test_list_snapshot_covers_dashboard_snapshot() {
        assert_eq!(Config::default().list_snapshot_limit(), 500);
        let config = Config {
            list_fetch_limit: 200,
            ..Config::default()
        };
        assert_eq!(config.list_snapshot_limit(), 500);
        let config = Config {
            list_fetch_limit: 800,
            ..Config::default()
        };
        assert_eq!(config.list_snapshot_limit(), 800);
    }

    #[test]
    fn test_patch_apply_to_only_touches_set_fields() {
        let now = Utc::now();
        let mut student = Student {
            id: "s1".into(),
            name: "Ana Lima".into(),
            email: "ana@example.com".into(),
            phone: None,
            grade: None,
            country: "Brazil".into(),
            status: AppStatus::Exploring,
            last_active: Some(now),
            last_communication_at: None,
            high_intent: false,
            needs_essay_help: false,
            tags: vec![],
            created_at: now,
            updated_at: now,
        };
        let patch = StudentPatch {
            status: Some(AppStatus::Applying),
            ..Default::default()
        };
        patch.apply_to(&mut student);
        assert_eq!(student.status, AppStatus::Applying);
        assert_eq!(student.last_active, Some(now));
        assert!(StudentPatch::default().is_empty());
        assert!(!patch.is_empty());
    }
}
