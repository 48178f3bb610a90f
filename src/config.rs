//! Configuration management for mpris-scrobbler

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default Last.fm web API endpoint
pub const DEFAULT_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Last.fm credentials
    pub lastfm: LastFmConfig,

    /// Tracking settings
    pub tracking: TrackingConfig,

    /// Player filtering
    pub players: PlayerConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Data directory (default: ~/.local/share/mpris-scrobbler)
    pub data_dir: Option<PathBuf>,
}

/// Last.fm API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LastFmConfig {
    /// API key of the registered Last.fm application
    pub api_key: String,

    /// Shared secret of the registered Last.fm application
    pub api_secret: String,

    /// Session key; read from `session_key_file` when unset
    pub session_key: Option<String>,

    /// Where `auth` stores the session key (default: <data dir>/session_key)
    pub session_key_file: Option<PathBuf>,

    /// Web API endpoint
    pub api_url: String,
}

/// Tracking behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Seconds between position polls
    pub poll_interval_seconds: u64,

    /// Timeout for a single D-Bus call in seconds
    pub dbus_timeout_seconds: u64,

    /// Artists whose name contains a comma and must not be split
    pub artists_with_commas: Vec<String>,
}

/// Player filtering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Whitelist of player names (empty = all players)
    pub whitelist: Vec<String>,

    /// Blacklist of player names
    pub blacklist: Vec<String>,
}

// Default implementations

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            data_dir: None,
        }
    }
}

impl Default for LastFmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            session_key: None,
            session_key_file: None,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 5,
            dbus_timeout_seconds: 5,
            artists_with_commas: vec![
                "Tyler, the Creator".to_string(),
                "Dream, Ivory".to_string(),
            ],
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            whitelist: Vec::new(),
            // Spotify submits its own scrobbles
            blacklist: vec!["spotify".to_string()],
        }
    }
}

impl TrackingConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    #[must_use]
    pub const fn dbus_timeout(&self) -> Duration {
        Duration::from_secs(self.dbus_timeout_seconds)
    }
}

impl PlayerConfig {
    /// Check if a player should be tracked.
    ///
    /// `player_id` is the bus name with the MPRIS prefix stripped.
    #[must_use]
    pub fn should_track(&self, player_id: &str) -> bool {
        // Check blacklist first
        if self.blacklist.iter().any(|p| player_id.contains(p.as_str())) {
            return false;
        }

        // If whitelist is empty, track all
        if self.whitelist.is_empty() {
            return true;
        }

        self.whitelist.iter().any(|p| player_id.contains(p.as_str()))
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::config("Could not determine config directory"))?;
        Ok(config_dir.join(crate::APP_NAME).join("config.toml"))
    }

    /// Get the data directory
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.general.data_dir {
            Ok(dir.clone())
        } else {
            let data_dir = dirs::data_local_dir()
                .ok_or_else(|| Error::config("Could not determine data directory"))?;
            Ok(data_dir.join(crate::APP_NAME))
        }
    }

    /// Get the session key file path
    pub fn session_key_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.lastfm.session_key_file {
            return Ok(path.clone());
        }
        Ok(self.data_dir()?.join("session_key"))
    }

    /// Resolve the session key from the config or the session key file.
    pub fn session_key(&self) -> Result<String> {
        if let Some(key) = self.lastfm.session_key.as_deref().map(str::trim) {
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }

        let path = self.session_key_path()?;
        if !path.exists() {
            return Err(Error::config(format!(
                "No session key configured and {} does not exist; run `{} auth` first",
                path.display(),
                crate::APP_NAME
            )));
        }

        let key = std::fs::read_to_string(&path)?.trim().to_string();
        if key.is_empty() {
            return Err(Error::config(format!("Session key file {} is empty", path.display())));
        }
        Ok(key)
    }

    /// Validate configuration values.
    ///
    /// Call this after loading to ensure all values are within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        if self.tracking.poll_interval_seconds == 0 {
            return Err(Error::config("poll_interval_seconds must be greater than 0"));
        }

        if self.tracking.dbus_timeout_seconds == 0 {
            return Err(Error::config("dbus_timeout_seconds must be greater than 0"));
        }

        // Validate log_level is a known level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "log_level must be one of {:?}, got '{}'",
                valid_levels, self.general.log_level
            )));
        }

        Ok(())
    }

    /// Check that the API credentials needed to talk to Last.fm are present.
    pub fn validate_credentials(&self) -> Result<()> {
        if self.lastfm.api_key.trim().is_empty() {
            return Err(Error::config("lastfm.api_key is not set"));
        }
        if self.lastfm.api_secret.trim().is_empty() {
            return Err(Error::config("lastfm.api_secret is not set"));
        }
        if self.lastfm.api_url.trim().is_empty() {
            return Err(Error::config("lastfm.api_url is not set"));
        }
        Ok(())
    }
}
