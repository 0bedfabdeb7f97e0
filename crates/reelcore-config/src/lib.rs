use std::path::{Path, PathBuf};

use reelcore_window::{GeometryError, WindowGeometry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub viewport: ViewportSettings,
    pub store: StoreSettings,
    pub task: TaskSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    pub row_extent: u32,
    pub viewport_extent: u32,
    pub overscan: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub record_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSettings {
    pub default_prime_limit: u64,
    /// Loop iterations between cancellation checks in the background worker.
    pub cancel_check_interval: u64,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            row_extent: 40,
            viewport_extent: 500,
            overscan: 5,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            record_count: 100_000,
        }
    }
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            default_prime_limit: 5_000_000,
            cancel_check_interval: 4096,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file")]
    Parse(#[from] toml::de::Error),
    #[error("invalid viewport settings")]
    Geometry(#[from] GeometryError),
    #[error("cancel_check_interval must be positive")]
    ZeroCancelInterval,
}

impl ViewportSettings {
    pub fn geometry(&self) -> Result<WindowGeometry, GeometryError> {
        WindowGeometry::new(self.row_extent, self.viewport_extent, self.overscan)
    }
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.viewport.geometry()?;
        if self.task.cancel_check_interval == 0 {
            return Err(ConfigError::ZeroCancelInterval);
        }
        Ok(())
    }
}
