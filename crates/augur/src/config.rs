//! Server configuration: defaults, an optional JSON file, and env overrides.
//!
//! ```json
//! {
//!   "bind": "0.0.0.0:8080",
//!   "reconnect_grace_ms": 10000,
//!   "pact": { "min_to_start": 3, "round_limit": 8 },
//!   "circle": "novice"
//! }
//! ```
//!
//! Every field is optional; missing ones keep their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use augur_room::{Circle, Pact, WordBank};
use augur_session::SessionConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Names the JSON config file to load.
pub const CONFIG_ENV: &str = "AUGUR_CONFIG";

/// Overrides [`ServerConfig::bind`].
pub const BIND_ENV: &str = "AUGUR_BIND";

/// Errors from loading a [`ServerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything the binary needs to start a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,

    /// Settings for every room the server creates.
    pub pact: Pact,

    /// How long a dropped participant keeps their seat. 0 means a
    /// disconnect is an immediate leave.
    pub reconnect_grace_ms: u64,

    /// A connection that sends nothing for this long is closed.
    pub idle_timeout_ms: u64,

    /// How often expired sessions are swept out of their rooms.
    pub reaper_interval_ms: u64,

    /// Replaces the built-in word bank when non-empty.
    pub words: Vec<String>,

    /// Only offer words of this difficulty.
    pub circle: Option<Circle>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            pact: Pact::default(),
            reconnect_grace_ms: 0,
            idle_timeout_ms: 60_000,
            reaper_interval_ms: 1_000,
            words: Vec::new(),
            circle: None,
        }
    }
}

impl ServerConfig {
    /// Reads a JSON config file.
    ///
    /// # Errors
    /// [`ConfigError::Read`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it is not a valid config.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_slice(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// Defaults, then the file named by `AUGUR_CONFIG` (if set), then
    /// `AUGUR_BIND` (if set).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };
        if let Ok(bind) = std::env::var(BIND_ENV) {
            config.bind = bind;
        }
        Ok(config)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            reconnect_grace: Duration::from_millis(self.reconnect_grace_ms),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms.max(1))
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_millis(self.reaper_interval_ms.max(1))
    }

    /// The configured words, or the built-in bank, narrowed to
    /// [`circle`](Self::circle) when that leaves anything to draw.
    pub fn word_bank(&self) -> WordBank {
        let bank = if self.words.is_empty() {
            WordBank::standard()
        } else {
            WordBank::from_words(&self.words)
        };
        let Some(circle) = self.circle else {
            return bank;
        };
        let narrowed = bank.restricted_to(circle);
        if narrowed.is_empty() {
            warn!(?circle, "no words of this circle, offering every word");
            bank
        } else {
            narrowed
        }
    }
}
