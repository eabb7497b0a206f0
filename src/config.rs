use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::session::{Rules, RulesError, Track};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Rules(#[from] RulesError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// User settings persisted between runs. Missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub countdown_secs: u32,
    pub time_limit_secs: u32,
    pub speed: f64,
    pub damping: f64,
    pub light_min_ms: u64,
    pub light_max_ms: u64,
    pub grace_ms: u64,
    pub tick_rate_ms: u64,
    /// How long a direction stays held without auto-repeat on terminals that
    /// don't report key releases
    pub hold_timeout_ms: u64,
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            countdown_secs: 3,
            time_limit_secs: 60,
            speed: 8.0,
            damping: 0.9,
            light_min_ms: 3000,
            light_max_ms: 6000,
            grace_ms: 100,
            tick_rate_ms: 16,
            hold_timeout_ms: 550,
            seed: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rules().validate()?;
        if self.tick_rate_ms == 0 {
            return Err(ConfigError::Invalid("tick rate must be at least 1ms".into()));
        }
        Ok(())
    }

    pub fn rules(&self) -> Rules {
        Rules {
            countdown_secs: self.countdown_secs,
            time_limit_secs: self.time_limit_secs,
            speed: self.speed,
            damping: self.damping,
            light_min: Duration::from_millis(self.light_min_ms),
            light_max: Duration::from_millis(self.light_max_ms),
            grace: Duration::from_millis(self.grace_ms),
            track: Track::default(),
            seed: self.seed,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "redlight") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("redlight_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::debug!("no config at {}: {e}", self.path.display());
                return Config::default();
            }
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("ignoring unreadable config {}: {e}", self.path.display());
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
