//! Configuration schema definitions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use gantry_core::{LogLevel, UserId};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GantryConfig {
    /// Command parsing settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// Cooldown notice throttling and housekeeping.
    #[serde(default)]
    pub cooldown: CooldownConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Command parsing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Prefix every command starts with.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Whether messages from bot accounts are dropped.
    #[serde(default = "default_true")]
    pub ignore_bots: bool,

    /// Users that bypass every permission check.
    #[serde(default)]
    pub owners: Vec<UserId>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            ignore_bots: true,
            owners: Vec::new(),
        }
    }
}

fn default_prefix() -> String {
    gantry_framework::DEFAULT_PREFIX.to_string()
}

fn default_true() -> bool {
    true
}

/// Cooldown settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownConfig {
    /// Window in which repeated cooldown notices are suppressed.
    #[serde(default = "default_notice_throttle_secs")]
    pub notice_throttle_secs: u64,

    /// How often expired timers are purged. The sweeper runs twice per interval.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            notice_throttle_secs: default_notice_throttle_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl CooldownConfig {
    pub fn notice_throttle(&self) -> Duration {
        Duration::from_secs(self.notice_throttle_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_notice_throttle_secs() -> u64 {
    15
}

fn default_sweep_interval_secs() -> u64 {
    300
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `Full` otherwise.
    Json,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Requires `logging.file_path`.
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file names and line numbers.
    #[serde(default)]
    pub file_location: bool,

    /// Per-module levels, e.g. `gantry_framework = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            filters: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GantryConfig::default();
        assert_eq!(config.bot.prefix, "!");
        assert!(config.bot.ignore_bots);
        assert_eq!(config.cooldown.notice_throttle(), Duration::from_secs(15));
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_partial_json() {
        let config: GantryConfig = serde_json::from_str(
            r#"{
                "bot": { "prefix": "?", "owners": [42] },
                "logging": { "level": "debug", "format": "pretty", "filters": { "gantry_framework": "trace" } }
            }"#,
        )
        .unwrap();

        assert_eq!(config.bot.prefix, "?");
        assert_eq!(config.bot.owners, [UserId(42)]);
        assert!(config.bot.ignore_bots);
        assert_eq!(config.cooldown, CooldownConfig::default());
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.filters["gantry_framework"], LogLevel::Trace);
    }

    #[test]
    fn test_unknown_level_rejected() {
        let result = serde_json::from_str::<LoggingConfig>(r#"{ "level": "loud" }"#);
        assert!(result.is_err());
    }
}
