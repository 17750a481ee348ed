//! Tests for configuration resolution and graceful degradation
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate NOVA_CONFIG or NOVA_PROFILE are marked with #[serial].

use nova_common::config::{NovaConfig, CONFIG_ENV_VAR, PROFILE_ENV_VAR};
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes()).expect("Failed to write config");
    file
}

#[test]
#[serial]
fn test_load_explicit_file() {
    env::remove_var(PROFILE_ENV_VAR);
    let file = write_config(
        r#"
        [telemetry]
        subscriber_id = "ui-1"
        channel_capacity = 32

        [logging]
        level = "debug"
        "#,
    );

    let config = NovaConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.telemetry.subscriber_id, "ui-1");
    assert_eq!(config.telemetry.channel_capacity, 32);
    assert_eq!(config.logging.level, "debug");
    assert!(config.profile_override.is_none());
}

#[test]
#[serial]
fn test_missing_explicit_file_uses_defaults() {
    env::remove_var(PROFILE_ENV_VAR);
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let config = NovaConfig::load(Some(&missing)).unwrap();
    assert_eq!(config, NovaConfig::default());
}

#[test]
#[serial]
fn test_malformed_file_is_error() {
    let file = write_config("this is = = not toml");
    assert!(NovaConfig::load(Some(file.path())).is_err());
}

#[test]
#[serial]
fn test_env_var_config_path() {
    env::remove_var(PROFILE_ENV_VAR);
    let file = write_config("profile_override = \"rtx_modern\"\n");
    env::set_var(CONFIG_ENV_VAR, file.path());

    let config = NovaConfig::load(None).unwrap();
    assert_eq!(config.profile_override.as_deref(), Some("rtx_modern"));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_profile_env_var_overrides_file() {
    let file = write_config("profile_override = \"rtx_modern\"\n");
    env::set_var(PROFILE_ENV_VAR, "pascal_2g");

    let config = NovaConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.profile_override.as_deref(), Some("pascal_2g"));

    env::remove_var(PROFILE_ENV_VAR);
}

#[test]
#[serial]
fn test_blank_profile_env_var_is_ignored() {
    env::set_var(PROFILE_ENV_VAR, "   ");
    let mut config = NovaConfig::default();
    config.apply_env_overrides();
    assert!(config.profile_override.is_none());
    env::remove_var(PROFILE_ENV_VAR);
}
