//! Application-level errors.
//!
//! Errors are classified by how the front end should surface them:
//! - NotFound: the view halts in an empty state
//! - WriteFailed / LoadFailed: transient notification, local state reverted
//! - RequiresUserAction: sign-in problems, bad configuration, invalid input
//!
//! Nothing is retried automatically. Every failure is reported once and the
//! operation is abandoned until the advisor re-triggers it.

use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum DeskError {
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("Failed to {action}: {source}")]
    WriteFailed {
        action: &'static str,
        #[source]
        source: DbError,
    },

    #[error("Failed to load {what}: {source}")]
    LoadFailed {
        what: &'static str,
        #[source]
        source: DbError,
    },

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),
}

/// Broad error class used by the front end to pick a presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    NotFound,
    Transient,
    RequiresUserAction,
}

impl DeskError {
    pub fn not_found(what: impl Into<String>) -> Self {
        DeskError::NotFound { what: what.into() }
    }

    pub fn write(action: &'static str, source: DbError) -> Self {
        match source {
            DbError::NotFound { collection, id } => {
                DeskError::not_found(format!("{} {}", collection, id))
            }
            source => DeskError::WriteFailed { action, source },
        }
    }

    pub fn load(what: &'static str, source: DbError) -> Self {
        DeskError::LoadFailed { what, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DeskError::NotFound { .. } => ErrorKind::NotFound,
            DeskError::WriteFailed { .. } | DeskError::LoadFailed { .. } => ErrorKind::Transient,
            DeskError::Unauthenticated
            | DeskError::InvalidCredentials
            | DeskError::Config(_)
            | DeskError::Validation(_) => ErrorKind::RequiresUserAction,
        }
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DeskError::NotFound { .. } => "Go back to the student list and pick another record.",
            DeskError::WriteFailed { .. } => "Nothing was saved. Try the action again.",
            DeskError::LoadFailed { .. } => "Reload the view to fetch the records again.",
            DeskError::Unauthenticated => "Sign in with `studentdesk signin`.",
            DeskError::InvalidCredentials => "Check the email and password and sign in again.",
            DeskError::Config(_) => "Check ~/.studentdesk/config.json.",
            DeskError::Validation(_) => "Correct the input and try again.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Ignored,
    Error,
}

/// One-shot notification shown to the advisor after an action.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Always false: failed operations are abandoned, never retried.
    pub can_retry: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_suggestion: Option<String>,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Success,
            message: message.into(),
            error_kind: None,
            can_retry: false,
            recovery_suggestion: None,
        }
    }

    /// Input was empty or the target vanished locally; nothing was attempted.
    pub fn ignored(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Ignored,
            message: message.into(),
            error_kind: None,
            can_retry: false,
            recovery_suggestion: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.level == NoticeLevel::Success
    }
}

impl From<&DeskError> for Notice {
    fn from(err: &DeskError) -> Self {
        Notice {
            level: NoticeLevel::Error,
            message: err.to_string(),
            error_kind: Some(err.kind()),
            can_retry: false,
            recovery_suggestion: Some(err.recovery_suggestion().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_not_found_becomes_not_found() {
        let err = DeskError::write(
            "add note",
            DbError::NotFound {
                collection: "student",
                id: "s-404".into(),
            },
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "student s-404 not found");
    }

    #[test]
    fn test_write_failure_is_transient_and_never_retryable() {
        let err = DeskError::write("add note", DbError::Unavailable("offline".into()));
        assert_eq!(err.kind(), ErrorKind::Transient);
        let notice = Notice::from(&err);
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(!notice.can_retry);
        assert!(notice.message.starts_with("Failed to add note"));
    }

    #[test]
    fn test_auth_errors_require_user_action() {
        assert_eq!(
            DeskError::Unauthenticated.kind(),
            ErrorKind::RequiresUserAction
        );
        assert_eq!(
            DeskError::InvalidCredentials.kind(),
            ErrorKind::RequiresUserAction
        );
    }
}
