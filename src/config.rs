//! Application-level configuration loading from the environment and an optional JSON file.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "FREE_THROW_CONFIG_PATH";
/// Display name of the archive folder holding every session.
const DEFAULT_ROOT_FOLDER: &str = "FreeThrowData";
const DEFAULT_PORT: u16 = 8080;

/// Which archive implementation backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveBackend {
    /// Google Drive through its REST API.
    Drive,
    /// Process-local store, lost on exit.
    Memory,
}

impl ArchiveBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "drive" => Some(Self::Drive),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    root_folder: String,
    teams: Vec<String>,
    backend: ArchiveBackend,
    port: u16,
}

impl AppConfig {
    /// Load the configuration file (if any), then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::from_file();
        config.apply_env(|key| env::var(key).ok());
        config
    }

    /// Display name of the archive root folder.
    pub fn root_folder(&self) -> &str {
        &self.root_folder
    }

    /// Team labels seeded into every new scoreboard.
    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    /// Selected archive implementation.
    pub fn backend(&self) -> ArchiveBackend {
        self.backend
    }

    /// TCP port the HTTP server listens on.
    pub fn port(&self) -> u16 {
        self.port
    }

    fn from_file() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        teams = ?app_config.teams,
                        "loaded configuration file"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(root) = lookup("DRIVE_ROOT").filter(|value| !value.trim().is_empty()) {
            self.root_folder = root;
        }

        if let Some(raw) = lookup("ARCHIVE_BACKEND") {
            match ArchiveBackend::parse(&raw) {
                Some(backend) => self.backend = backend,
                None => warn!(value = %raw, "unknown ARCHIVE_BACKEND; keeping {:?}", self.backend),
            }
        }

        if let Some(port) = lookup("PORT")
            .or_else(|| lookup("SERVER_PORT"))
            .and_then(|value| value.parse::<u16>().ok())
        {
            self.port = port;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_folder: DEFAULT_ROOT_FOLDER.to_string(),
            teams: default_teams(),
            backend: ArchiveBackend::Drive,
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    root_folder: Option<String>,
    #[serde(default)]
    teams: Option<Vec<String>>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        let teams = value
            .teams
            .map(|teams| {
                teams
                    .into_iter()
                    .map(|team| team.trim().to_string())
                    .filter(|team| !team.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|teams| !teams.is_empty())
            .unwrap_or(defaults.teams);
        Self {
            root_folder: value.root_folder.unwrap_or(defaults.root_folder),
            teams,
            ..defaults
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn default_teams() -> Vec<String> {
    vec!["A".to_string(), "B".to_string()]
}
