//! Config model and persistence helpers.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

use crate::convert::Mode;

/// Top-level configuration stored in `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where the conversion service lives.
    #[serde(default)]
    pub server: ServerCfg,
    /// Conversion defaults.
    #[serde(default)]
    pub convert: ConvertCfg,
    /// Application log output.
    #[serde(default)]
    pub log: LogCfg,
}

/// Conversion service endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerCfg {
    /// Base URL, e.g. `http://127.0.0.1:8000`.
    pub base_url: String,
    /// Per-request timeout; conversions of large workbooks can take minutes.
    pub timeout_secs: u64,
}

/// Behaviour of the conversion screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertCfg {
    /// Mode selected at start-up.
    pub default_mode: Mode,
    /// Open returned outputs in the browser (never for box labels).
    pub open_downloads: bool,
}

/// File logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogCfg {
    /// File the tracing output is written to.
    pub file: String,
}

impl Default for ServerCfg {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            timeout_secs: 300,
        }
    }
}

impl Default for ConvertCfg {
    fn default() -> Self {
        Self {
            default_mode: Mode::Allocation,
            open_downloads: true,
        }
    }
}

impl Default for LogCfg {
    fn default() -> Self {
        Self {
            file: "batch_convert.log".into(),
        }
    }
}

impl Config {
    /// Load from disk or create defaults when missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)?;
            Ok(toml::from_str(&s)?)
        } else {
            let cfg = Self::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// Persist the config as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let s = toml::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs.max(1))
    }
}
