//! Path utilities for determining data and config locations.
//!
//! Config lives under the platform config directory and data (the database
//! and the MCP log) under the platform data directory, each in a
//! `todo-assistant/` subdirectory.

use std::path::{Path, PathBuf};

/// Subdirectory name used under the platform directories.
const APP_DIR_NAME: &str = "todo-assistant";

/// The config filename.
pub const CONFIG_FILENAME: &str = "config.yaml";

/// The database filename.
pub const DATABASE_FILENAME: &str = "todo.db";

/// The MCP server log filename.
pub const LOG_FILENAME: &str = "mcp.log";

/// Environment variable overriding the config file path.
pub const CONFIG_ENV: &str = "TODO_ASSISTANT_CONFIG";

/// Environment variable overriding the database path.
pub const DB_ENV: &str = "TODO_ASSISTANT_DB";

/// Get the application config directory, e.g. `~/.config/todo-assistant/`.
///
/// Returns `None` if the platform directory cannot be determined.
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME))
}

/// Get the application data directory, e.g. `~/.local/share/todo-assistant/`.
///
/// Returns `None` if the platform directory cannot be determined.
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME))
}

/// Get the config file path, honouring [`CONFIG_ENV`].
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    env_path(CONFIG_ENV).or_else(|| config_dir().map(|dir| dir.join(CONFIG_FILENAME)))
}

/// Get the default database path.
#[must_use]
pub fn default_db_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join(DATABASE_FILENAME))
}

/// Get the MCP log path.
#[must_use]
pub fn log_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join(LOG_FILENAME))
}

/// Resolve the database path: flag, then [`DB_ENV`], then config, then default.
#[must_use]
pub fn db_path(flag: Option<&Path>, configured: Option<&Path>) -> Option<PathBuf> {
    choose_db_path(flag, env_path(DB_ENV).as_deref(), configured, default_db_path())
}

/// Pick the first available database path in precedence order.
#[must_use]
pub fn choose_db_path(
    flag: Option<&Path>,
    env: Option<&Path>,
    configured: Option<&Path>,
    default: Option<PathBuf>,
) -> Option<PathBuf> {
    flag.or(env).or(configured).map(Path::to_path_buf).or(default)
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var).filter(|v| !v.is_empty()).map(PathBuf::from)
}
