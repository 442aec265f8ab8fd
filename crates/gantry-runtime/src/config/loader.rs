//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config`: enables TOML configuration files (`gantry.toml`, `config.toml`)
//! - `yaml-config`: enables YAML configuration files (`gantry.yaml`, `gantry.yml`, ...)
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic overrides passed to [`ConfigLoader::merge`]
//! 3. Profile-specific config file (`gantry.{profile}.toml`)
//! 4. Main config file (`gantry.toml`)
//! 5. Environment variables (`GANTRY_*`)
//!
//! # Environment Variable Mapping
//!
//! Variables use the `GANTRY_` prefix with `__` as the section separator:
//!
//! - `GANTRY_BOT__PREFIX=?` → `bot.prefix = "?"`
//! - `GANTRY_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `GANTRY_COOLDOWN__SWEEP_INTERVAL_SECS=60` → `cooldown.sweep_interval_secs = 60`
//!
//! # Example
//!
//! ```rust,ignore
//! use gantry_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./config/gantry.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace};

use super::error::{ConfigError, ConfigResult};
use super::schema::GantryConfig;
use super::validation::validate_config;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "GANTRY_";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `GANTRY_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var("GANTRY_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layered configuration loader.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a directory searched for configuration files.
    ///
    /// Without explicit search paths the current directory and the user
    /// configuration directory are searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges a configuration value above the built-in defaults.
    pub fn merge(mut self, config: GantryConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and validates the configuration.
    pub fn load(self) -> ConfigResult<GantryConfig> {
        let profile = self.profile.clone();
        let config: GantryConfig = self.build_figment()?.extract()?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            prefix = %config.bot.prefix,
            logging_level = %config.logging.level.as_str(),
            "Configuration loaded"
        );
        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let user_figment = std::mem::take(&mut self.figment);
        let mut figment =
            Figment::from(Serialized::defaults(GantryConfig::default())).merge(user_figment);

        match &self.config_file {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "Loading configuration file");
                figment = merge_config_file(figment, path)?;
            }
            Some(path) => return Err(ConfigError::FileNotFound(path.clone())),
            None => figment = self.load_config_files(figment)?,
        }

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Loading environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }
        Ok(figment)
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("gantry"));
        }
        paths
    }

    /// Merges the first base file found, preceded by its profile variant.
    fn load_config_files(&self, mut figment: Figment) -> ConfigResult<Figment> {
        for dir in self.resolve_search_paths() {
            for base in candidate_files() {
                let Some((stem, ext)) = base.rsplit_once('.') else {
                    continue;
                };

                let profile_path = dir.join(format!("{stem}.{}.{ext}", self.profile));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = merge_config_file(figment, &profile_path)?;
                }

                let base_path = dir.join(base);
                if base_path.exists() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    return merge_config_file(figment, &base_path);
                }
            }
        }
        debug!("No configuration file found, using defaults");
        Ok(figment)
    }
}

/// File names searched in each directory, by enabled format.
fn candidate_files() -> Vec<&'static str> {
    #[allow(unused_mut)]
    let mut names = Vec::new();
    #[cfg(feature = "toml-config")]
    names.extend(["gantry.toml", "config.toml"]);
    #[cfg(feature = "yaml-config")]
    names.extend(["gantry.yaml", "gantry.yml", "config.yaml", "config.yml"]);
    names
}

/// Merges one file, dispatching on its extension.
#[allow(unused_variables)]
fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(Toml::file(path))),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        _ => Err(ConfigError::ParseError(format!(
            "Unsupported or disabled configuration file format: .{ext}"
        ))),
    }
}

/// Loads the configuration from the default locations.
pub fn load_config() -> ConfigResult<GantryConfig> {
    ConfigLoader::new().load()
}

/// Loads the configuration from one file, plus environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<GantryConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BotConfig;

    fn empty_dir() -> PathBuf {
        std::env::temp_dir().join("gantry-config-test-empty")
    }

    #[test]
    fn test_default_config() {
        let config = ConfigLoader::new()
            .search_path(empty_dir())
            .without_env()
            .load()
            .unwrap();
        assert_eq!(config, GantryConfig::default());
    }

    #[test]
    fn test_merge_overrides_defaults() {
        let config = ConfigLoader::new()
            .search_path(empty_dir())
            .without_env()
            .merge(GantryConfig {
                bot: BotConfig {
                    prefix: "?".into(),
                    ..Default::default()
                },
                ..Default::default()
            })
            .load()
            .unwrap();
        assert_eq!(config.bot.prefix, "?");
    }

    #[test]
    fn test_invalid_merge_rejected() {
        let result = ConfigLoader::new()
            .search_path(empty_dir())
            .without_env()
            .merge(GantryConfig {
                bot: BotConfig {
                    prefix: String::new(),
                    ..Default::default()
                },
                ..Default::default()
            })
            .load();
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::new()
            .file(empty_dir().join("missing.toml"))
            .without_env()
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("PROD"), Profile::Production);
        assert_eq!(Profile::parse("dev"), Profile::Development);
        assert_eq!(Profile::parse("staging"), Profile::Custom("staging".into()));
        assert_eq!(Profile::Custom("staging".into()).to_string(), "staging");
    }
}
