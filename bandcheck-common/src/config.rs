//! Configuration loading and config file resolution
//!
//! Configuration is a single optional TOML file. Missing or unreadable files
//! never terminate a run: the loader logs a warning and falls back to
//! compiled defaults.
//!
//! # Config File Resolution Priority
//!
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`BANDCHECK_CONFIG`)
//! 3. User config directory (`<config_dir>/bandcheck/config.toml`)
//! 4. No file: compiled defaults

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "BANDCHECK_CONFIG";

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional in the file; absent fields take the defaults
/// defined below.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct TomlConfig {
    /// Active region used when explaining knowledge-base restrictions
    /// (e.g. "NA", "EMEA", "APAC")
    #[serde(default)]
    pub region: Option<String>,

    /// Active carrier whose requirement record applies (e.g. "Verizon")
    #[serde(default)]
    pub carrier: Option<String>,

    /// Knowledge-base document used when none is given on the command line
    #[serde(default)]
    pub knowledge_base: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Report output configuration (optional)
    #[serde(default)]
    pub report: ReportConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Report output configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct ReportConfig {
    /// Pretty-print the JSON report
    #[serde(default)]
    pub pretty: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// Unlike [`load_or_default`], a missing or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from a file, degrading to defaults
    ///
    /// A missing, unreadable or invalid file logs a warning and yields
    /// `TomlConfig::default()`.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            debug!("No config file resolved, using compiled defaults");
            return Self::default();
        };

        match Self::load(path) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!(
                    "Could not load config {} ({}), using compiled defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        let level = self.logging.level.to_lowercase();
        if !LEVELS.contains(&level.as_str()) {
            return Err(Error::Config(format!(
                "Invalid log level '{}', expected one of {:?}",
                self.logging.level, LEVELS
            )));
        }
        Ok(())
    }
}

/// Resolves which config file (if any) applies to this run
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Resolve the config file path following the priority order
    ///
    /// Only the command-line and environment paths are returned without an
    /// existence check; a missing explicit file is reported by the loader.
    pub fn resolve(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: User config directory
        let user_config = default_config_path()?;
        if user_config.exists() {
            Some(user_config)
        } else {
            None
        }
    }
}

/// Get the platform config file location (`<config_dir>/bandcheck/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bandcheck").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.logging.level, "info");
        assert!(!config.report.pretty);
    }

    #[test]
    fn test_full_toml() {
        let config = TomlConfig::from_toml_str(
            r#"
region = "NA"
carrier = "Verizon"
knowledge_base = "/opt/kb.json"

[logging]
level = "debug"

[report]
pretty = true
"#,
        )
        .unwrap();

        assert_eq!(config.region.as_deref(), Some("NA"));
        assert_eq!(config.carrier.as_deref(), Some("Verizon"));
        assert_eq!(config.knowledge_base, Some(PathBuf::from("/opt/kb.json")));
        assert_eq!(config.logging.level, "debug");
        assert!(config.report.pretty);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let result = TomlConfig::from_toml_str("[logging]\nlevel = \"loud\"\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = TomlConfig::from_toml_str("region = ");
        assert!(matches!(result, Err(Error::Toml(_))));
    }

    #[test]
    fn test_load_or_default_without_path() {
        assert_eq!(TomlConfig::load_or_default(None), TomlConfig::default());
    }
}
