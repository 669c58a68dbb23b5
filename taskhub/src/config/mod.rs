//! Configuration system for `TaskHub`.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskhub/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};

use taskhub_proto::layout::{PRESENCE_PATH, TASK_UPDATES_PATH, TASKS_COLLECTION, USERS_COLLECTION};

use crate::notify::{ChannelSettings, DEFAULT_EVENT_BUFFER, DEFAULT_FALLBACK_ACTOR_NAME};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A value is outside its accepted range.
    #[error("invalid config value for {key}: {reason}")]
    Invalid {
        /// Dotted key, e.g. `realtime.event_buffer`.
        key: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    store: StoreFileConfig,
    realtime: RealtimeFileConfig,
    session: SessionFileConfig,
}

/// `[store]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StoreFileConfig {
    tasks_collection: Option<String>,
    users_collection: Option<String>,
}

/// `[realtime]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RealtimeFileConfig {
    updates_path: Option<String>,
    presence_path: Option<String>,
    event_buffer: Option<usize>,
}

/// `[session]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SessionFileConfig {
    fallback_actor_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskhubConfig {
    // -- Store --
    /// Document collection holding tasks.
    pub tasks_collection: String,
    /// Document collection holding user profiles.
    pub users_collection: String,

    // -- Realtime --
    /// Realtime path holding update notices.
    pub updates_path: String,
    /// Realtime path holding presence records.
    pub presence_path: String,
    /// Bound on undelivered change events per subscription.
    pub event_buffer: usize,

    // -- Session --
    /// Name shown in change messages when a notice carries none.
    pub fallback_actor_name: String,
}

impl Default for TaskhubConfig {
    fn default() -> Self {
        Self {
            tasks_collection: TASKS_COLLECTION.to_string(),
            users_collection: USERS_COLLECTION.to_string(),
            updates_path: TASK_UPDATES_PATH.to_string(),
            presence_path: PRESENCE_PATH.to_string(),
            event_buffer: DEFAULT_EVENT_BUFFER,
            fallback_actor_name: DEFAULT_FALLBACK_ACTOR_NAME.to_string(),
        }
    }
}

impl TaskhubConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an
    /// error. Otherwise the default path (`~/.config/taskhub/config.toml`)
    /// is tried and silently ignored if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed,
    /// if a collection name is empty, if a realtime path is empty or the
    /// root, or if the resolved event buffer is zero.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        let config = Self::resolve(cli, &file);
        config.validate()?;
        Ok(config)
    }

    /// Resolve a `TaskhubConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            tasks_collection: file
                .store
                .tasks_collection
                .clone()
                .unwrap_or(defaults.tasks_collection),
            users_collection: file
                .store
                .users_collection
                .clone()
                .unwrap_or(defaults.users_collection),
            updates_path: file
                .realtime
                .updates_path
                .clone()
                .unwrap_or(defaults.updates_path),
            presence_path: file
                .realtime
                .presence_path
                .clone()
                .unwrap_or(defaults.presence_path),
            event_buffer: cli
                .event_buffer
                .or(file.realtime.event_buffer)
                .unwrap_or(defaults.event_buffer),
            fallback_actor_name: file
                .session
                .fallback_actor_name
                .clone()
                .unwrap_or(defaults.fallback_actor_name),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let collections = [
            ("store.tasks_collection", &self.tasks_collection),
            ("store.users_collection", &self.users_collection),
        ];
        for (key, name) in collections {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must not be empty",
                });
            }
        }
        let paths = [
            ("realtime.updates_path", &self.updates_path),
            ("realtime.presence_path", &self.presence_path),
        ];
        for (key, path) in paths {
            if path.trim_matches('/').is_empty() {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must name a path below the root",
                });
            }
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::Invalid {
                key: "realtime.event_buffer",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Settings for the update notification channel.
    #[must_use]
    pub fn channel_settings(&self) -> ChannelSettings {
        ChannelSettings {
            updates_path: self.updates_path.clone(),
            event_buffer: self.event_buffer,
            fallback_actor_name: self.fallback_actor_name.clone(),
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Task board with realtime change notices")]
pub struct CliArgs {
    /// Path to config file (default: `~/.config/taskhub/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKHUB_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskhub.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Bound on undelivered change events per subscription.
    #[arg(long)]
    pub event_buffer: Option<usize>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(path) = explicit_path {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }

    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = config_dir.join("taskhub").join("config.toml");

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
