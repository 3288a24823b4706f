//! TOML application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const APP_DIR_NAME: &str = "trailcast";
const CONFIG_FILE_NAME: &str = "config.toml";
const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {message}")]
    Validation { message: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub overlay: OverlayConfig,
    pub recording: RecordingConfig,
    pub host: HostConfig,
    pub settings: SettingsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub title: String,
    pub always_on_top: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            title: "Trailcast".to_string(),
            always_on_top: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Defaults to the user's video directory.
    pub output_dir: Option<PathBuf>,
    pub ffmpeg_path: PathBuf,
    pub frame_rate: u32,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            frame_rate: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// The host counts as present while this file exists.
    pub presence_marker: Option<PathBuf>,
    pub poll_interval_ms: u64,
    /// Loopback UDP port for remote control; 0 disables it.
    pub control_port: u16,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            presence_marker: None,
            poll_interval_ms: 2000,
            control_port: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub store_path: Option<PathBuf>,
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or validated.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self> {
        let path = path.unwrap_or_else(Self::default_config_path);
        let config = match std::fs::read_to_string(&path) {
            Ok(raw) => Self::parse(&raw, &path)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        config.validate()?;
        Ok(config)
    }

    fn parse(raw: &str, path: &Path) -> Result<Self> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.recording.frame_rate == 0 {
            return Err(ConfigError::Validation {
                message: "recording.frame_rate must be greater than 0".to_string(),
            });
        }
        if self.host.poll_interval_ms == 0 {
            return Err(ConfigError::Validation {
                message: "host.poll_interval_ms must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.settings.store_path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from(".local/share"))
                .join(APP_DIR_NAME)
                .join(SETTINGS_FILE_NAME)
        })
    }

    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.recording.output_dir.clone().unwrap_or_else(|| {
            dirs::video_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR_NAME)
        })
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.host.poll_interval_ms)
    }
}
