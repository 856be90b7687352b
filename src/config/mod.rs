use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};

pub const DEFAULT_SCOPE: &str = "https://graph.microsoft.com/Sites.ReadWrite.All";

/// Identity-provider and remote list settings, persisted as `settings.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub authority: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub site_url: String,
    #[serde(default)]
    pub list_name: String,
}

fn default_scopes() -> Vec<String> {
    vec![DEFAULT_SCOPE.to_string()]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            authority: String::new(),
            scopes: default_scopes(),
            site_url: String::new(),
            list_name: String::new(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or return defaults if the file does not exist.
    pub fn load(path: &Path) -> AppResult<Self> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let settings: Settings = serde_json::from_str(&content)?;
                debug!(path = %path.display(), "settings loaded");
                Ok(settings)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "settings file not found, using defaults");
                Ok(Settings::default())
            }
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Overwrite the settings file in place.
    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Apply a `key=value` assignment coming from the CLI.
    pub fn set(&mut self, assignment: &str) -> AppResult<()> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| AppError::Config(format!("expected key=value, got '{assignment}'")))?;
        let value = value.trim().to_string();

        match key.trim() {
            "client_id" => self.client_id = value,
            "authority" => self.authority = value,
            "site_url" => self.site_url = value,
            "list_name" => self.list_name = value,
            "scopes" => {
                self.scopes = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if self.scopes.is_empty() {
                    self.scopes = default_scopes();
                }
            }
            other => return Err(AppError::Config(format!("unknown setting '{other}'"))),
        }
        Ok(())
    }

    /// True when both the identity provider and the target list are configured.
    pub fn remote_enabled(&self) -> bool {
        !self.client_id.is_empty()
            && !self.authority.is_empty()
            && !self.site_url.is_empty()
            && !self.list_name.is_empty()
    }
}

/// Locations of every file the application reads or writes.
#[derive(Debug, Clone)]
pub struct Paths {
    pub dir: PathBuf,
}

impl Paths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Use `--dir` when given, otherwise the platform data directory.
    pub fn resolve(custom: Option<&str>) -> Self {
        match custom {
            Some(d) => Self::new(crate::utils::path::expand_tilde(d)),
            None => Self::new(Self::default_dir()),
        }
    }

    /// Return the standard data directory depending on the platform
    pub fn default_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(appdata).join("rclockin")
        } else {
            let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            home.join(".rclockin")
        }
    }

    pub fn settings_file(&self) -> PathBuf {
        self.dir.join("settings.json")
    }

    pub fn ledger_file(&self) -> PathBuf {
        self.dir.join("time_log.csv")
    }

    pub fn session_file(&self) -> PathBuf {
        self.dir.join("session.json")
    }

    pub fn target_file(&self) -> PathBuf {
        self.dir.join("remote_target.json")
    }

    pub fn token_cache_file(&self) -> PathBuf {
        self.dir.join("token_cache.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.dir.join("logs")
    }

    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }
}
