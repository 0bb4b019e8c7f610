//! Unit tests for configuration resolution and graceful degradation
//!
//! Tests cover:
//! - Missing TOML files SHALL NOT cause termination
//! - Missing configs → warning + defaults
//! - Priority order for config file resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate BANDCHECK_CONFIG are marked with #[serial].

use bandcheck_common::config::{ConfigResolver, TomlConfig, CONFIG_ENV_VAR};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

#[test]
#[serial]
fn test_cli_path_takes_precedence_over_env() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/bandcheck-env.toml");

    let resolver = ConfigResolver::new(Some(PathBuf::from("/tmp/bandcheck-cli.toml")));
    assert_eq!(
        resolver.resolve(),
        Some(PathBuf::from("/tmp/bandcheck-cli.toml"))
    );

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_path() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/bandcheck-env.toml");

    let resolver = ConfigResolver::new(None);
    assert_eq!(
        resolver.resolve(),
        Some(PathBuf::from("/tmp/bandcheck-env.toml"))
    );

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_blank_env_var_ignored() {
    env::set_var(CONFIG_ENV_VAR, "   ");

    let resolver = ConfigResolver::new(None);
    let resolved = resolver.resolve();
    // Falls through to the user config directory, which may or may not exist
    assert_ne!(resolved, Some(PathBuf::from("   ")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_missing_file_degrades_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist.toml");

    let config = TomlConfig::load_or_default(Some(&missing));
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_invalid_file_degrades_to_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "region = [unclosed").unwrap();

    let config = TomlConfig::load_or_default(Some(file.path()));
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_strict_load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(TomlConfig::load(&missing).is_err());
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "region = \"EMEA\"\ncarrier = \"Vodafone\"\n\n[logging]\nlevel = \"warn\"\n"
    )
    .unwrap();

    let config = TomlConfig::load_or_default(Some(file.path()));
    assert_eq!(config.region.as_deref(), Some("EMEA"));
    assert_eq!(config.carrier.as_deref(), Some("Vodafone"));
    assert_eq!(config.logging.level, "warn");
    assert!(config.knowledge_base.is_none());
}
