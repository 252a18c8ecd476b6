use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Tunables for the scanner and the watch loop.
///
/// Loaded from an optional TOML file, then overridden by command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TailConfig {
    /// Number of lines to show
    #[serde(default = "default_lines")]
    pub lines: usize,
    /// Bytes fetched per backward read
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Delay between a modification event and the re-scan
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_lines() -> usize {
    10
}

fn default_window_size() -> usize {
    16
}

fn default_debounce_ms() -> u64 {
    2000
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            lines: default_lines(),
            window_size: default_window_size(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl TailConfig {
    /// Load from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: TailConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            bail!("window_size must be at least 1 byte");
        }
        if i64::try_from(self.window_size).is_err() {
            bail!("window_size {} is too large", self.window_size);
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
