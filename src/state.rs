use std::fs;
use std::path::{Path, PathBuf};

use crate::db::DeskDb;
use crate::error::DeskError;
use crate::session::{LocalIdentityProvider, SessionProvider};
use crate::types::Config;

/// Environment override for the database location.
pub const DB_PATH_ENV: &str = "STUDENTDESK_DB";

/// Everything one invocation needs: configuration, the store connection and
/// the session provider. Created once in `main` and passed by reference.
pub struct AppState {
    pub config: Config,
    pub db: DeskDb,
    pub session: SessionProvider,
}

impl AppState {
    /// Load config, open the database and settle the session.
    pub fn new() -> Result<Self, DeskError> {
        let config = load_config().map_err(DeskError::Config)?;
        let db_path = resolve_db_path(&config).map_err(DeskError::Config)?;
        log::debug!("Opening database at {}", db_path.display());
        let db = DeskDb::open_at(db_path)
            .map_err(|e| DeskError::Config(format!("Failed to open database: {}", e)))?;
        let token_path = session_token_path().map_err(DeskError::Config)?;

        let state = Self::with_parts(config, db, SessionProvider::new(Some(token_path)));
        state.session.init(&state.identity());
        Ok(state)
    }

    /// Assemble state from already-open parts. The session is left unsettled.
    pub fn with_parts(config: Config, db: DeskDb, session: SessionProvider) -> Self {
        Self {
            config,
            db,
            session,
        }
    }

    pub fn identity(&self) -> LocalIdentityProvider<'_> {
        LocalIdentityProvider::new(&self.db)
    }

    /// Demo seeding is available in debug builds, or when the config opts in.
    pub fn dev_tools_enabled(&self) -> bool {
        cfg!(debug_assertions) || self.config.developer_mode
    }
}

/// Get the state directory (~/.studentdesk)
pub fn state_dir() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".studentdesk"))
}

/// Get the canonical config file path (~/.studentdesk/config.json)
pub fn config_path() -> Result<PathBuf, String> {
    Ok(state_dir()?.join("config.json"))
}

/// Where the signed-in session token is kept between invocations.
pub fn session_token_path() -> Result<PathBuf, String> {
    Ok(state_dir()?.join("session"))
}

/// Database location: `STUDENTDESK_DB`, then `databasePath` from the config,
/// then `~/.studentdesk/studentdesk.db`.
pub fn resolve_db_path(config: &Config) -> Result<PathBuf, String> {
    let from_env = std::env::var(DB_PATH_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);
    let explicit = from_env.or_else(|| config.database_path.as_ref().map(PathBuf::from));
    DeskDb::resolve_path(explicit.as_deref()).map_err(|e| e.to_string())
}

/// Load configuration from ~/.studentdesk/config.json. A missing file means
/// defaults.
pub fn load_config() -> Result<Config, String> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config, String> {
    let config = read_config(path)?;
    validate_config(&config)?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
}

/// Limits must be positive, and the list snapshot must cover the dashboard
/// snapshot so counter click-throughs find every student they counted.
pub fn validate_config(config: &Config) -> Result<(), String> {
    if config.dashboard_fetch_limit == 0 || config.list_fetch_limit == 0 {
        return Err("Fetch limits must be greater than zero".to_string());
    }
    if config.list_fetch_limit < config.dashboard_fetch_limit {
        return Err(format!(
            "listFetchLimit ({}) must be at least dashboardFetchLimit ({})",
            config.list_fetch_limit, config.dashboard_fetch_limit
        ));
    }
    Ok(())
}

/// Create or update config.json.
///
/// Starts from the file on disk (or defaults), applies the mutator and writes
/// the result back only if it passes validation.
pub fn create_or_update_config(
    path: &Path,
    mutator: impl FnOnce(&mut Config) -> Result<(), String>,
) -> Result<Config, String> {
    let mut config = read_config(path)?;
    mutator(&mut config)?;
    validate_config(&config)?;

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config dir: {}", e))?;
        }
    }

    let content = serde_json::to_string_pretty(&config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))?;

    log::info!("Wrote config to {}", path.display());
    Ok(config)
}

/// Set one config field by its JSON name. An empty `databasePath` clears it.
pub fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<(), String> {
    fn limit(key: &str, value: &str) -> Result<usize, String> {
        value
            .trim()
            .parse()
            .map_err(|_| format!("{} expects a whole number, got '{}'", key, value))
    }

    match key {
        "databasePath" => {
            let value = value.trim();
            config.database_path = (!value.is_empty()).then(|| value.to_string());
        }
        "dashboardFetchLimit" => config.dashboard_fetch_limit = limit(key, value)?,
        "listFetchLimit" => config.list_fetch_limit = limit(key, value)?,
        "summaryInteractionLimit" => config.summary_interaction_limit = limit(key, value)?,
        "authorId" => {
            if value.trim().is_empty() {
                return Err("authorId cannot be empty".to_string());
            }
            config.author_id = value.trim().to_string();
        }
        "developerMode" => {
            config.developer_mode = value
                .trim()
                .parse()
                .map_err(|_| format!("developerMode expects true or false, got '{}'", value))?;
        }
        other => return Err(format!("Unknown config key '{}'", other)),
    }
    Ok(())
}
