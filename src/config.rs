//! Runner configuration loaded from `seqtask.toml`.
//!
//! [`RunnerConfig`] holds the default job settings and the log filter.
//! Missing keys fall back to defaults; the `SEQTASK_LOG` environment variable
//! takes precedence over the file for the log filter.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::runner::JobParams;

/// File looked up in the working directory by [`RunnerConfig::load`].
pub const CONFIG_FILE: &str = "seqtask.toml";

/// Environment variable overriding [`RunnerConfig::log_filter`].
pub const LOG_ENV: &str = "SEQTASK_LOG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Defaults applied to jobs built from this configuration.
    #[serde(default)]
    pub job: JobParams,

    /// `tracing` filter directive, e.g. `info` or `seqtask=debug`.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            job: JobParams::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl RunnerConfig {
    /// Load `seqtask.toml` from the current directory, or defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str::<RunnerConfig>(&contents)
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(filter) = std::env::var(LOG_ENV)
            && !filter.trim().is_empty()
        {
            config.log_filter = filter;
        }

        Ok(config)
    }
}
