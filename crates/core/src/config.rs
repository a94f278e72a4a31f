//! Application configuration loaded from disk and the environment.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_DISPLAY_COUNT;

/// Directory under the user's config dir holding `config.toml`.
pub const CONFIG_DIR: &str = "tally";
/// Prefix for environment overrides, e.g. `TALLY_RESET_DELAY_MS`.
pub const ENV_PREFIX: &str = "TALLY";

const DEFAULT_CONFIG: &str = r#"# Tally configuration

# Delay before the board clears after a game is finished.
reset_delay_ms = 4000

# Number of archived games shown in the history panel.
history_display = 5

# Maximum number of archived games kept in memory (unset keeps every game).
# history_limit = 50

# chrono format string used for the archive date.
date_format = "%d/%m/%Y"

# Directory receiving tally.log.
log_dir = "logs"
"#;

/// Runtime settings shared by the engine and the terminal UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Milliseconds between finishing a game and the automatic reset.
    pub reset_delay_ms: u64,
    /// Archived games surfaced to the presentation layer.
    pub history_display: usize,
    /// Optional cap on archived games held in memory.
    pub history_limit: Option<usize>,
    /// Format applied to the archive date of a game.
    pub date_format: String,
    /// Directory for log files, relative to the working directory when not absolute.
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reset_delay_ms: 4000,
            history_display: DEFAULT_DISPLAY_COUNT,
            history_limit: None,
            date_format: "%d/%m/%Y".to_string(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file location and `TALLY_*` variables.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load configuration from `path` (optional file) merged with the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        let config: AppConfig = settings
            .try_deserialize()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Delay before the automatic reset following a finished game.
    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }
}

/// Location of the user configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join("config.toml")
}

/// Write the commented default configuration when no file exists yet.
///
/// Returns the path of the file when it was created by this call.
pub fn ensure_default_config() -> Result<Option<PathBuf>> {
    ensure_default_config_at(config_path())
}

/// Write the commented default configuration to `path` when it is missing.
pub fn ensure_default_config_at(path: impl AsRef<Path>) -> Result<Option<PathBuf>> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(None);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(Some(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_file_matches_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("config.toml");
        assert_eq!(ensure_default_config_at(&path)?, Some(path.clone()));
        assert!(path.exists());
        assert_eq!(ensure_default_config_at(&path)?, None);

        let loaded = AppConfig::load_from(&path)?;
        assert_eq!(loaded, AppConfig::default());
        Ok(())
    }

    #[test]
    fn existing_file_is_left_alone() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "reset_delay_ms = 250\nhistory_limit = 3\n")?;
        assert_eq!(ensure_default_config_at(&path)?, None);

        let loaded = AppConfig::load_from(&path)?;
        assert_eq!(loaded.reset_delay(), Duration::from_millis(250));
        assert_eq!(loaded.history_limit, Some(3));
        assert_eq!(loaded.history_display, DEFAULT_DISPLAY_COUNT);
        assert_eq!(loaded.date_format, "%d/%m/%Y");
        Ok(())
    }

    #[test]
    fn missing_file_uses_defaults() -> Result<()> {
        let dir = tempdir()?;
        let loaded = AppConfig::load_from(dir.path().join("absent.toml"))?;
        assert_eq!(loaded.reset_delay_ms, 4000);
        Ok(())
    }
}
