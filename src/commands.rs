//! Command layer between the CLI and the services.
//!
//! Every command resolves its route through the session guard before touching
//! the store. Commands return `DeskError`; the binary turns them into notices.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::devtools::{self, SeedReport};
use crate::error::DeskError;
use crate::filter::{CountryFilter, SortColumn, SortDirection, StatusFilter, QUICK_FILTER_PARAM};
use crate::services::dashboard::{get_dashboard_data, DashboardResult};
use crate::services::students::{StudentList, StudentProfile};
use crate::session::{guard, AdvisorUser, GuardDecision, Route};
use crate::state::{create_or_update_config, set_config_value, AppState};
use crate::types::Config;

/// Options for the student list command.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub query: Option<String>,
    pub status: Option<StatusFilter>,
    pub country: Option<String>,
    /// Raw `qf` token. Unknown tokens filter nothing.
    pub quick: Option<String>,
    pub sort: Option<SortColumn>,
    pub descending: bool,
}

impl ListOptions {
    /// Navigation state as it would appear in the list URL.
    fn nav_query(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(ref token) = self.quick {
            query.append_pair(QUICK_FILTER_PARAM, token);
        }
        query.finish()
    }
}

/// Resolve a protected route for the current session.
pub fn enter(state: &AppState, route: Route) -> Result<AdvisorUser, DeskError> {
    match guard(route, &state.session.snapshot()) {
        GuardDecision::Allow => state.session.require_user(),
        GuardDecision::Wait => Err(DeskError::Validation(
            "Session is still being restored".to_string(),
        )),
        GuardDecision::Redirect(to) => {
            log::debug!("Redirecting {} to {}", route.path(), to.path());
            Err(DeskError::Unauthenticated)
        }
    }
}

/// Sign in. A session that is already signed in is kept as is.
pub fn sign_in(state: &AppState, email: &str, password: &str) -> Result<AdvisorUser, DeskError> {
    if let GuardDecision::Redirect(to) = guard(Route::SignIn, &state.session.snapshot()) {
        if let Some(user) = state.session.current_user() {
            log::info!("Already signed in, continuing to {}", to.path());
            return Ok(user);
        }
    }
    state.session.sign_in(&state.identity(), email, password)
}

pub fn sign_out(state: &AppState) -> Result<(), DeskError> {
    state.session.sign_out(&state.identity())
}

/// Create an advisor account. Needs a signed-in advisor unless dev tools are
/// enabled, so a fresh desk can be bootstrapped.
pub fn add_advisor(
    state: &AppState,
    email: &str,
    password: &str,
    display_name: Option<&str>,
) -> Result<AdvisorUser, DeskError> {
    if !state.dev_tools_enabled() {
        state.session.require_user()?;
    }
    state.identity().register(email, password, display_name)
}

pub fn dashboard(state: &AppState, now: DateTime<Utc>) -> Result<DashboardResult, DeskError> {
    enter(state, Route::Dashboard)?;
    Ok(get_dashboard_data(&state.db, &state.config, now))
}

pub fn list_students(state: &AppState, options: &ListOptions) -> Result<StudentList, DeskError> {
    enter(state, Route::Students)?;
    let mut list = StudentList::load(&state.db, &state.config, &options.nav_query())?;

    if let Some(ref query) = options.query {
        list.filter.query = query.clone();
    }
    if let Some(ref status) = options.status {
        list.filter.status = status.clone();
    }
    if let Some(ref country) = options.country {
        list.filter.country = CountryFilter::from(country.as_str());
    }
    if let Some(column) = options.sort {
        let direction = if options.descending {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        list.sort.set(column, direction);
    }
    Ok(list)
}

pub fn open_profile(state: &AppState, id: &str) -> Result<StudentProfile, DeskError> {
    enter(state, Route::StudentProfile)?;
    StudentProfile::load(&state.db, &state.config, id)
}

/// Set one field in `config.json`. Takes effect on the next invocation. Runs
/// without a session so a config that no longer loads can be repaired.
pub fn set_config(path: &Path, key: &str, value: &str) -> Result<Config, DeskError> {
    create_or_update_config(path, |config| set_config_value(config, key, value))
        .map_err(DeskError::Config)
}

pub fn seed(state: &AppState, count: usize) -> Result<SeedReport, DeskError> {
    enter(state, Route::DevSeed)?;
    devtools::seed_students(state, count)
}

pub fn seed_interactions(state: &AppState) -> Result<SeedReport, DeskError> {
    enter(state, Route::DevSeed)?;
    devtools::seed_interactions(state)
}
