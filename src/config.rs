//! Configuration for portfolio-pair

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{JwtIdentityProvider, JwtValidator};
use crate::error::{PairError, Result};

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("portfolio-pair")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the SQLite database and this file
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// HS256 secret for bearer tokens. Never written back to disk.
    #[serde(default, skip_serializing)]
    pub jwt_secret: Option<String>,

    /// Lifetime of issued tokens
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: u64,

    /// How long a write waits on a locked database before failing as unavailable
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,

    /// Use the fixed development secret when no secret is configured
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_http_port() -> u16 {
    8095
}

fn default_token_expiry() -> u64 {
    3600
}

fn default_busy_timeout() -> u64 {
    5000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            http_port: default_http_port(),
            jwt_secret: None,
            token_expiry_secs: default_token_expiry(),
            busy_timeout_ms: default_busy_timeout(),
            dev_mode: false,
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PairError::Config(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&content).map_err(|e| PairError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| PairError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Build the token validator.
    ///
    /// Without a secret this fails unless `dev_mode` is set.
    pub fn jwt_validator(&self) -> Result<JwtValidator> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => JwtValidator::new(secret.clone(), self.token_expiry_secs),
            (None, true) => Ok(JwtValidator::new_dev()),
            (None, false) => Err(PairError::Config(
                "jwt_secret is required (set PORTFOLIO_PAIR_JWT_SECRET or use --dev)".into(),
            )),
        }
    }

    pub fn identity_provider(&self) -> Result<JwtIdentityProvider> {
        Ok(JwtIdentityProvider::new(self.jwt_validator()?))
    }
}
