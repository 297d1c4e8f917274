//! Advisor identity and the single app-wide session.
//!
//! `LocalIdentityProvider` keeps advisor accounts in the desk database.
//! `SessionProvider` is created once by `AppState` and passed by reference to
//! everything that needs the current user; there is no global session.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::db::{DbAdvisor, DeskDb};
use crate::error::DeskError;
use crate::util::name_from_email;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
}

impl From<DbAdvisor> for AdvisorUser {
    fn from(a: DbAdvisor) -> Self {
        let display_name = a
            .display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| name_from_email(&a.email));
        AdvisorUser {
            id: a.id,
            email: a.email,
            display_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: AdvisorUser,
}

// =============================================================================
// Identity provider
// =============================================================================

pub trait IdentityProvider {
    fn sign_in(&self, email: &str, password: &str) -> Result<Session, DeskError>;
    fn sign_out(&self, token: &str) -> Result<(), DeskError>;
    fn current_user(&self, token: &str) -> Result<Option<AdvisorUser>, DeskError>;
}

/// Rounds of SHA-256 applied on top of the salted digest.
const PASSWORD_HASH_ROUNDS: u32 = 10_000;

/// Salted, iterated SHA-256. Stretching slows offline guessing against a
/// copied database file; it is not a memory-hard KDF and suits a local desk,
/// not a hosted service.
fn hash_password(salt: &str, password: &str) -> String {
    let mut digest = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(b":")
        .chain_update(password.as_bytes())
        .finalize();
    for _ in 1..PASSWORD_HASH_ROUNDS {
        digest = Sha256::new()
            .chain_update(salt.as_bytes())
            .chain_update(digest)
            .finalize();
    }
    hex::encode(digest)
}

/// Email/password accounts stored in the `advisors` table.
pub struct LocalIdentityProvider<'a> {
    db: &'a DeskDb,
}

impl<'a> LocalIdentityProvider<'a> {
    pub fn new(db: &'a DeskDb) -> Self {
        Self { db }
    }

    /// Create an advisor account.
    pub fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AdvisorUser, DeskError> {
        let email = email.trim();
        if !email.contains('@') {
            return Err(DeskError::Validation(format!(
                "'{}' is not an email address",
                email
            )));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DeskError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        let existing = self
            .db
            .get_advisor_by_email(email)
            .map_err(|e| DeskError::load("advisor", e))?;
        if existing.is_some() {
            return Err(DeskError::Validation(format!(
                "An advisor with email {} already exists",
                email
            )));
        }

        let salt = uuid::Uuid::new_v4().simple().to_string();
        let advisor = DbAdvisor {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_lowercase(),
            display_name: display_name.map(str::to_string),
            password_hash: hash_password(&salt, password),
            password_salt: salt,
            created_at: Utc::now(),
        };
        self.db
            .insert_advisor(&advisor)
            .map_err(|e| DeskError::write("create advisor", e))?;
        log::info!("Registered advisor {}", advisor.email);
        Ok(advisor.into())
    }
}

impl IdentityProvider for LocalIdentityProvider<'_> {
    fn sign_in(&self, email: &str, password: &str) -> Result<Session, DeskError> {
        let advisor = self
            .db
            .get_advisor_by_email(email)
            .map_err(|e| DeskError::load("advisor", e))?
            .ok_or(DeskError::InvalidCredentials)?;

        if hash_password(&advisor.password_salt, password) != advisor.password_hash {
            log::warn!("Rejected sign-in for {}", advisor.email);
            return Err(DeskError::InvalidCredentials);
        }

        let token = uuid::Uuid::new_v4().to_string();
        self.db
            .insert_session(&token, &advisor.id)
            .map_err(|e| DeskError::write("start session", e))?;
        Ok(Session {
            token,
            user: advisor.into(),
        })
    }

    fn sign_out(&self, token: &str) -> Result<(), DeskError> {
        self.db
            .delete_session(token)
            .map_err(|e| DeskError::write("end session", e))
    }

    fn current_user(&self, token: &str) -> Result<Option<AdvisorUser>, DeskError> {
        self.db
            .get_session_advisor(token)
            .map(|a| a.map(AdvisorUser::from))
            .map_err(|e| DeskError::load("session", e))
    }
}

// =============================================================================
// Session provider
// =============================================================================

/// Point-in-time view of the session for the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub user: Option<AdvisorUser>,
    pub loading: bool,
}

#[derive(Debug)]
struct SessionState {
    session: Option<Session>,
    loading: bool,
}

/// Owns the one session of this process. Starts out loading; `init` settles
/// it by restoring a persisted token if there is one.
#[derive(Debug)]
pub struct SessionProvider {
    state: RwLock<SessionState>,
    token_path: Option<PathBuf>,
}

impl SessionProvider {
    /// `token_path` persists the token between CLI invocations; `None` keeps
    /// the session in memory only.
    pub fn new(token_path: Option<PathBuf>) -> Self {
        Self {
            state: RwLock::new(SessionState {
                session: None,
                loading: true,
            }),
            token_path,
        }
    }

    pub fn init(&self, identity: &dyn IdentityProvider) {
        let restored = self.read_token().and_then(|token| {
            match identity.current_user(&token) {
                Ok(Some(user)) => Some(Session { token, user }),
                Ok(None) => {
                    log::info!("Stored session is no longer valid");
                    self.clear_token();
                    None
                }
                Err(e) => {
                    log::warn!("Could not restore session: {}", e);
                    None
                }
            }
        });

        let mut state = self.state.write();
        state.session = restored;
        state.loading = false;
    }

    pub fn sign_in(
        &self,
        identity: &dyn IdentityProvider,
        email: &str,
        password: &str,
    ) -> Result<AdvisorUser, DeskError> {
        let session = identity.sign_in(email.trim(), password)?;
        self.write_token(&session.token);
        let user = session.user.clone();

        let mut state = self.state.write();
        state.session = Some(session);
        state.loading = false;
        log::info!("Signed in as {}", user.email);
        Ok(user)
    }

    /// Tear the session down. Local state is cleared even when the store
    /// call fails.
    pub fn sign_out(&self, identity: &dyn IdentityProvider) -> Result<(), DeskError> {
        let previous = self.state.write().session.take();
        self.clear_token();
        match previous {
            Some(session) => identity.sign_out(&session.token),
            None => Ok(()),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read();
        SessionSnapshot {
            user: state.session.as_ref().map(|s| s.user.clone()),
            loading: state.loading,
        }
    }

    pub fn current_user(&self) -> Option<AdvisorUser> {
        self.state.read().session.as_ref().map(|s| s.user.clone())
    }

    /// Current user, or `Unauthenticated`.
    pub fn require_user(&self) -> Result<AdvisorUser, DeskError> {
        self.current_user().ok_or(DeskError::Unauthenticated)
    }

    fn read_token(&self) -> Option<String> {
        let path = self.token_path.as_ref()?;
        let token = fs::read_to_string(path).ok()?;
        let token = token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    fn write_token(&self, token: &str) {
        let Some(path) = self.token_path.as_ref() else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Could not create {}: {}", parent.display(), e);
                return;
            }
        }
        if let Err(e) = fs::write(path, token) {
            log::warn!("Could not persist session token: {}", e);
        }
    }

    fn clear_token(&self) {
        if let Some(path) = self.token_path.as_ref() {
            if path.exists() {
                if let Err(e) = fs::remove_file(path) {
                    log::warn!("Could not remove session token: {}", e);
                }
            }
        }
    }
}

// =============================================================================
// Route guard
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    SignIn,
    Dashboard,
    Students,
    StudentProfile,
    DevSeed,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::SignIn => "/login",
            Route::Dashboard => "/dashboard",
            Route::Students => "/students",
            Route::StudentProfile => "/students/:id",
            Route::DevSeed => "/dev/seed",
        }
    }

    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::SignIn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still settling; render nothing yet.
    Wait,
    Allow,
    Redirect(Route),
}

pub fn guard(route: Route, snapshot: &SessionSnapshot) -> GuardDecision {
    if snapshot.loading {
        return GuardDecision::Wait;
    }
    match (route.is_protected(), snapshot.user.is_some()) {
        (true, false) => GuardDecision::Redirect(Route::SignIn),
        (false, true) => GuardDecision::Redirect(Route::Students),
        _ => GuardDecision::Allow,
    }
}
