//! Bot configuration.
//!
//! Lookup order: explicit path, `JUKEBOT_CONFIG`, `./jukebot.toml`, then the
//! built-in defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ControllerError, Result};

pub const CONFIG_ENV_VAR: &str = "JUKEBOT_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "jukebot.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Prefix in front of every chat command
    pub command_prefix: String,
    /// How many upcoming tracks `queue` shows
    pub queue_preview: usize,
    /// How many tracks a mix expands to
    pub mix_size: usize,
    /// Path or name of the yt-dlp executable
    pub ytdlp_path: String,
    /// yt-dlp format selector for audio streams
    pub audio_format: String,
    pub socket_timeout_secs: u64,
    /// Default filter when `RUST_LOG` is unset
    pub log_level: String,
    pub console: ConsoleConfig,
}

/// Identity the console front-end pretends to have
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub guild: u64,
    pub text_channel: u64,
    /// Voice channel the console user starts in; `None` means not in voice
    pub voice_channel: Option<u64>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            command_prefix: "!".to_string(),
            queue_preview: 10,
            mix_size: 10,
            ytdlp_path: "yt-dlp".to_string(),
            audio_format: "bestaudio[ext=m4a]/bestaudio".to_string(),
            socket_timeout_secs: 15,
            log_level: "info".to_string(),
            console: ConsoleConfig::default(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            guild: 1,
            text_channel: 1,
            voice_channel: Some(1),
        }
    }
}

impl BotConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ControllerError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ControllerError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml(&content)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from the first location that exists.
    ///
    /// An explicitly named file (argument or env var) must exist; the default
    /// file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&PathBuf::from(path));
        }

        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            return Self::from_file(&default_path);
        }

        log::debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }
}
