//! Configuration consumed by the client core.
//!
//! The core only ever receives a [`Config`] value. Reading it from
//! `~/.config/warbler/config.toml` is the binary's business; [`Config::load`]
//! exists for that purpose.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::auth::{KeyMaterial, TokenPair};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiFormat {
    #[default]
    Xml,
    Json,
}

impl ApiFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ApiFormat::Xml => "xml",
            ApiFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineKind {
    #[default]
    Home,
    Friends,
}

impl TimelineKind {
    pub fn path(&self) -> &'static str {
        match self {
            TimelineKind::Home => "statuses/home_timeline",
            TimelineKind::Friends => "statuses/friends_timeline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortenerKind {
    #[default]
    None,
    IsGd,
}

/// Delay policy after a failed poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Backoff {
    /// Wait for the next regular tick.
    #[default]
    Fixed,
    /// Double the interval per consecutive failure, capped at `max_secs`.
    Exponential { max_secs: u64 },
}

impl Backoff {
    pub fn delay(&self, base: Duration, consecutive_failures: u32) -> Duration {
        match *self {
            Backoff::Fixed => base,
            Backoff::Exponential { max_secs } => {
                let factor = 1u32.checked_shl(consecutive_failures).unwrap_or(u32::MAX);
                base.saturating_mul(factor).min(Duration::from_secs(max_secs).max(base))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub api_base: String,
    pub search_url: String,
    pub stream_url: String,
    pub access_token_url: String,
    pub shortener_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: "https://api.twitter.com/1".to_string(),
            search_url: "https://search.twitter.com/search.atom".to_string(),
            stream_url: "https://userstream.twitter.com/2/user.json".to_string(),
            access_token_url: "https://api.twitter.com/oauth/access_token".to_string(),
            shortener_url: "https://is.gd/create.php".to_string(),
        }
    }
}

impl Endpoints {
    pub fn timeline_url(&self, kind: TimelineKind, format: ApiFormat) -> String {
        format!(
            "{}/{}.{}",
            self.api_base.trim_end_matches('/'),
            kind.path(),
            format.extension()
        )
    }

    pub fn update_url(&self, format: ApiFormat) -> String {
        format!(
            "{}/statuses/update.{}",
            self.api_base.trim_end_matches('/'),
            format.extension()
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect_secs: u64,
    pub request_secs: u64,
    /// Longest silence tolerated on a stream before it is considered dead.
    pub stream_read_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 30,
            stream_read_secs: 90,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn stream_read(&self) -> Duration {
        Duration::from_secs(self.stream_read_secs)
    }
}

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token_key: Option<String>,
    pub token_secret: Option<String>,
    /// Label sent as the `source` field when posting.
    pub source: String,
    pub debug: u8,
    pub quiet: bool,
    pub fetch_interval_secs: u64,
    pub display_interval_secs: u64,
    pub shortener: ShortenerKind,
    pub lang: Option<String>,
    pub api_format: ApiFormat,
    pub timeline: TimelineKind,
    pub cache_dir: Option<PathBuf>,
    /// Only seed the cursor from the first poll instead of showing it.
    pub skip_initial_batch: bool,
    pub endpoints: Endpoints,
    pub timeouts: TimeoutConfig,
    pub backoff: Backoff,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            consumer_key: String::new(),
            consumer_secret: String::new(),
            token_key: None,
            token_secret: None,
            source: "warbler".to_string(),
            debug: 0,
            quiet: false,
            fetch_interval_secs: 60,
            display_interval_secs: 5,
            shortener: ShortenerKind::default(),
            lang: None,
            api_format: ApiFormat::default(),
            timeline: TimelineKind::default(),
            cache_dir: None,
            skip_initial_batch: true,
            endpoints: Endpoints::default(),
            timeouts: TimeoutConfig::default(),
            backoff: Backoff::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// `~/.config/warbler/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("warbler").join("config.toml"))
    }

    /// Configured cache directory, or `<cache dir>/warbler/images`.
    pub fn images_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir().ok_or(ConfigError::NoCacheDir)?;
        Ok(cache_dir.join("warbler").join("images"))
    }

    pub fn key_material(&self) -> KeyMaterial {
        let token = match (&self.token_key, &self.token_secret) {
            (Some(key), Some(secret)) => Some(TokenPair {
                key: key.clone(),
                secret: secret.clone(),
            }),
            _ => None,
        };

        KeyMaterial {
            consumer_key: self.consumer_key.clone(),
            consumer_secret: self.consumer_secret.clone(),
            token,
        }
    }

    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval_secs)
    }

    pub fn display_interval(&self) -> Duration {
        Duration::from_secs(self.display_interval_secs)
    }

    /// Response bodies are attached to protocol errors from debug level 2 on.
    pub fn verbose(&self) -> bool {
        self.debug >= 2
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.debug {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine cache directory")]
    NoCacheDir,

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
