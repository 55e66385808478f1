//! Runner configuration loaded from a TOML file.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::ordering::Ranked;

/// Runner configuration (TOML).
///
/// Every field is optional. An empty `runners` list selects the built-in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnersConfig {
    /// Wall-clock budget for a single runner attempt, in seconds.
    pub timeout_secs: u64,

    /// Keep at most this many bytes of each of stdout and stderr per attempt.
    pub output_limit_bytes: usize,

    pub runners: Vec<RunnerEntry>,
}

/// One configured runner.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunnerEntry {
    #[serde(default)]
    pub name: String,

    /// Lower values are tried first. Must be greater than zero.
    #[serde(default)]
    pub priority: u32,

    /// Supported models; empty means any model.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,

    /// Executable to launch instead of the runner's default program name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Replaces the runner's built-in quota detection patterns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit_patterns: Option<Vec<String>>,
}

impl RunnerEntry {
    pub fn new(name: impl Into<String>, priority: u32) -> Self {
        Self {
            name: name.into(),
            priority,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }
}

impl Ranked for RunnerEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> u32 {
        self.priority
    }
}

impl Default for RunnersConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30 * 60,
            output_limit_bytes: 1_000_000,
            runners: Vec::new(),
        }
    }
}

impl RunnersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        for entry in &self.runners {
            if entry.name.trim().is_empty() {
                return Err(anyhow!("runner name is required"));
            }
            if entry.priority == 0 {
                return Err(anyhow!(
                    "runner {:?} priority must be greater than zero",
                    entry.name
                ));
            }
        }
        Ok(())
    }

    /// Trim names, models and commands; drop blank models.
    fn normalize(&mut self) {
        for entry in &mut self.runners {
            entry.name = entry.name.trim().to_string();
            entry.models = entry
                .models
                .iter()
                .map(|m| m.trim())
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
            entry.command = entry
                .command
                .take()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty());
        }
    }
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<RunnersConfig> {
    let mut cfg: RunnersConfig = toml::from_str(contents).context("parse runner config")?;
    cfg.normalize();
    cfg.validate()?;
    Ok(cfg)
}

/// Load runner configuration from a TOML file.
///
/// `None` returns `RunnersConfig::default()`.
pub fn load_config(path: Option<&Path>) -> Result<RunnersConfig> {
    let Some(path) = path else {
        let cfg = RunnersConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    };
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("load {}", path.display()))
}
