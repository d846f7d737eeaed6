// tests/error_handling.rs

use std::collections::HashMap;
use std::io::Write;

use tempfile::NamedTempFile;

use scoutwarden::config::loader::overrides_from_vars;
use scoutwarden::config::{load_and_validate, ConfigOverrides};
use scoutwarden::errors::WardenError;

fn no_overrides() -> ConfigOverrides {
    ConfigOverrides::default()
}

#[test]
fn zero_timeout_returns_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[timing]
timeout_ms = 0
"#
    )
    .unwrap();

    let result = load_and_validate(file.path(), true, &no_overrides());

    match result {
        Err(WardenError::ConfigError(msg)) => assert!(msg.contains("timeout_ms")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unknown_key_returns_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[worker]
name = "ccr"
retries = 3
"#
    )
    .unwrap();

    let result = load_and_validate(file.path(), true, &no_overrides());
    assert!(matches!(result, Err(WardenError::TomlError(_))));
}

#[test]
fn explicit_config_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("Scoutwarden.toml");

    let result = load_and_validate(&missing, true, &no_overrides());
    assert!(matches!(result, Err(WardenError::IoError(_))));

    let cfg = load_and_validate(&missing, false, &no_overrides()).unwrap();
    assert_eq!(cfg.worker.name, "ccr");
    assert_eq!(cfg.timing.timeout_ms, 600_000);
}

#[test]
fn env_timeout_must_be_numeric() {
    let env: HashMap<&str, &str> = HashMap::from([("CCR_TIMEOUT_MS", "ten minutes")]);
    let result = overrides_from_vars(|k| env.get(k).map(|v| v.to_string()));

    match result {
        Err(WardenError::ConfigError(msg)) => assert!(msg.contains("CCR_TIMEOUT_MS")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn overrides_win_over_file_values() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[worker]
path = "/from/file/ccr"

[timing]
timeout_ms = 1000
"#
    )
    .unwrap();

    let overrides = ConfigOverrides {
        worker_path: Some("  /from/env/ccr  ".into()),
        timeout_ms: Some(2500),
    };
    let cfg = load_and_validate(file.path(), true, &overrides).unwrap();

    assert_eq!(cfg.worker.path.as_deref(), Some("/from/env/ccr"));
    assert_eq!(cfg.timing.timeout_ms, 2500);
}

#[test]
fn zero_override_is_rejected_after_merge() {
    let overrides = ConfigOverrides {
        worker_path: None,
        timeout_ms: Some(0),
    };
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("absent.toml"), false, &overrides);
    assert!(matches!(result, Err(WardenError::ConfigError(_))));
}
