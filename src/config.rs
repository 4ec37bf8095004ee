use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::map::MapBounds;
use crate::models::Coords;
use crate::utils;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config mutex poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub collaborator_timeout_secs: u64,
    pub discovery_region: String,
    pub discovery_count: u32,
    pub timezone: String,
    /// Where promoted candidates are placed until an admin corrects them.
    pub fallback_coords: Coords,
    pub map_bounds: MapBounds,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            collaborator_timeout_secs: 30,
            discovery_region: "Monterrey, Mexico".to_string(),
            discovery_count: 5,
            timezone: "America/Monterrey".to_string(),
            fallback_coords: Coords {
                lat: 25.6751,
                lng: -100.3185,
            },
            map_bounds: MapBounds::default(),
        }
    }
}

impl AppConfig {
    /// Environment wins over the stored key so secrets can stay out of the file.
    pub fn effective_api_key(&self) -> Option<String> {
        ["GEMINI_API_KEY", "API_KEY"]
            .iter()
            .find_map(|name| std::env::var(name).ok())
            .or_else(|| self.gemini_api_key.clone())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs.max(1))
    }
}

pub struct ConfigStore {
    path: PathBuf,
    data: Mutex<AppConfig>,
}

impl ConfigStore {
    pub fn load(root: &Path) -> Self {
        let path = utils::config_path(root);
        let data = match read_config(&path) {
            Ok(mut config) => {
                if !config.map_bounds.is_valid() {
                    tracing::warn!(
                        bounds = ?config.map_bounds,
                        "map bounds must satisfy min < max, using defaults"
                    );
                    config.map_bounds = MapBounds::default();
                }
                config
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), "ignoring unreadable config: {err}");
                AppConfig::default()
            }
        };
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    pub fn read(&self) -> AppConfig {
        match self.data.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update<F>(&self, transform: F) -> Result<AppConfig, ConfigError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut guard = self.data.lock().map_err(|_| ConfigError::Poisoned)?;
        transform(&mut guard);
        write_config(&self.path, &guard)?;
        Ok(guard.clone())
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    utils::ensure_parent(path);
    let contents = serde_json::to_string_pretty(config)?;
    fs::write(path, contents)?;
    Ok(())
}
