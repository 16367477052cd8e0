//! User configuration: store location and deletion retention window.
//!
//! # Responsibility
//! - Locate, create (with defaults) and parse `~/.config/qwtd.toml`.
//! - Expand `~` in the configured store path.
//! - Turn `days_to_delete` into a validated retention `Duration`.
//!
//! # Invariants
//! - Configuration is loaded once by the entry point and passed explicitly;
//!   core code never reads it from global state.
//! - Unknown keys are ignored so older builds accept newer files.

use directories::BaseDirs;
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "~/qwtd.db";
pub const DEFAULT_DAYS_TO_DELETE: f64 = 7.0;
const CONFIG_FILE_NAME: &str = "qwtd.toml";
const SECONDS_PER_DAY: f64 = 24.0 * 60.0 * 60.0;

const DEFAULT_CONFIG_TOML: &str = "db = \"~/qwtd.db\"\ndays_to_delete = 7\n";

#[derive(Debug)]
pub enum ConfigError {
    /// Home directory could not be determined for `~` expansion.
    NoHomeDir,
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    /// `days_to_delete` is negative, not finite, or too large.
    InvalidRetention(f64),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoHomeDir => write!(f, "cannot determine home directory"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Parse { path, source } => {
                write!(f, "failed to parse {}: {source}", path.display())
            }
            Self::InvalidRetention(days) => write!(
                f,
                "days_to_delete must be a finite, non-negative number of days, got {days}"
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::NoHomeDir | Self::InvalidRetention(_) => None,
        }
    }
}

/// Parsed `qwtd.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Store file path; a leading `~` is expanded to the home directory.
    pub db: String,
    /// Retention window for soft-deleted notes, in (possibly fractional) days.
    pub days_to_delete: f64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db: DEFAULT_DB_PATH.to_string(),
            days_to_delete: DEFAULT_DAYS_TO_DELETE,
        }
    }
}

impl CoreConfig {
    /// Parses and validates configuration text.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.retention_window()?;
        Ok(config)
    }

    /// Loads the file at `path`, writing the default configuration first when
    /// it does not exist yet.
    pub fn load_or_init(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            write_default_config(path)?;
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text, path)?;
        info!(
            "event=config_load module=config status=ok path={} days_to_delete={}",
            path.display(),
            config.days_to_delete
        );
        Ok(config)
    }

    /// Store path with `~` expanded.
    pub fn db_path(&self) -> Result<PathBuf, ConfigError> {
        expand_home(&self.db)
    }

    /// Grace period between soft delete and eligibility for sweeping.
    pub fn retention_window(&self) -> Result<Duration, ConfigError> {
        let days = self.days_to_delete;
        if !days.is_finite() || days < 0.0 {
            return Err(ConfigError::InvalidRetention(days));
        }
        Duration::try_from_secs_f64(days * SECONDS_PER_DAY)
            .map_err(|_| ConfigError::InvalidRetention(days))
    }
}

/// `~/.config/qwtd.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = home_dir()?;
    Ok(home.join(".config").join(CONFIG_FILE_NAME))
}

/// Expands a leading `~` or `~/` to the home directory.
pub fn expand_home(raw: &str) -> Result<PathBuf, ConfigError> {
    if raw == "~" {
        return home_dir();
    }
    match raw.strip_prefix("~/") {
        Some(rest) => Ok(home_dir()?.join(rest)),
        None => Ok(PathBuf::from(raw)),
    }
}

fn home_dir() -> Result<PathBuf, ConfigError> {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TOML).map_err(io_error)?;
    info!(
        "event=config_init module=config status=ok path={}",
        path.display()
    );
    Ok(())
}
