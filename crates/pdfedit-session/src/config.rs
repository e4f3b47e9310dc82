//! Session configuration
//!
//! Loaded from TOML, then optionally overridden from the environment:
//!
//! ```toml
//! on_busy = "reject"
//! queue_capacity = 8
//! engine_timeout_ms = 10000
//! thumbnail_max_px = 200
//! ```

use anyhow::Context;
use pdfedit_core::MAX_THUMBNAIL_PX;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_ENGINE_TIMEOUT_MS: &str = "PDFEDIT_ENGINE_TIMEOUT_MS";
pub const ENV_ON_BUSY: &str = "PDFEDIT_ON_BUSY";

/// What to do with an engine-bound request while another one is running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnBusy {
    /// Run it after the current one, in arrival order
    #[default]
    Queue,
    /// Refuse it with `EditorError::Busy`
    Reject,
}

impl FromStr for OnBusy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queue" => Ok(OnBusy::Queue),
            "reject" => Ok(OnBusy::Reject),
            other => anyhow::bail!("Unknown busy policy '{}', expected queue or reject", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub on_busy: OnBusy,
    /// Requests buffered ahead of the dispatcher
    pub queue_capacity: usize,
    /// Upper bound for each engine call; `0` or absent disables it
    pub engine_timeout_ms: Option<u64>,
    /// Longest side of a thumbnail image, `1..=MAX_THUMBNAIL_PX`
    pub thumbnail_max_px: u32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            on_busy: OnBusy::Queue,
            queue_capacity: 32,
            engine_timeout_ms: Some(30_000),
            thumbnail_max_px: 160,
        }
    }
}

impl EditorConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the session cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=MAX_THUMBNAIL_PX).contains(&self.thumbnail_max_px) {
            anyhow::bail!(
                "thumbnail_max_px must be between 1 and {}, got {}",
                MAX_THUMBNAIL_PX,
                self.thumbnail_max_px
            );
        }
        Ok(())
    }

    /// Apply `PDFEDIT_*` environment overrides
    pub fn with_env_overrides(self) -> anyhow::Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        if let Some(raw) = lookup(ENV_ENGINE_TIMEOUT_MS) {
            let ms = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{} must be a number of milliseconds", ENV_ENGINE_TIMEOUT_MS))?;
            self.engine_timeout_ms = Some(ms);
        }
        if let Some(raw) = lookup(ENV_ON_BUSY) {
            self.on_busy = raw
                .parse()
                .with_context(|| format!("Invalid {}", ENV_ON_BUSY))?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn engine_timeout(&self) -> Option<Duration> {
        self.engine_timeout_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }
}
