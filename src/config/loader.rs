// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, ConfigOverrides, RawConfigFile};
use crate::config::validate::validate_config;
use crate::errors::{Result, WardenError};

/// Environment variable naming the worker executable.
pub const WORKER_PATH_ENV: &str = "CCR_PATH";
/// Environment variable overriding the hard timeout, in milliseconds.
pub const TIMEOUT_ENV: &str = "CCR_TIMEOUT_MS";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for
/// semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load, apply overrides, validate.
///
/// A missing file is only acceptable when `required` is false (the default
/// config path was not given explicitly); defaults are used in that case.
pub fn load_and_validate(
    path: impl AsRef<Path>,
    required: bool,
    overrides: &ConfigOverrides,
) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw = if !required && !path.exists() {
        debug!(path = %path.display(), "no config file; using defaults");
        RawConfigFile::default()
    } else {
        load_from_path(path)?
    };

    let mut config = ConfigFile::try_from(raw)?;
    apply_overrides(&mut config, overrides);
    validate_config(&config)?;
    Ok(config)
}

pub fn apply_overrides(config: &mut ConfigFile, overrides: &ConfigOverrides) {
    if let Some(path) = overrides.worker_path.as_ref() {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            config.worker.path = Some(trimmed.to_string());
        }
    }
    if let Some(ms) = overrides.timeout_ms {
        config.timing.timeout_ms = ms;
    }
}

/// Read overrides from the process environment.
pub fn overrides_from_env() -> Result<ConfigOverrides> {
    overrides_from_vars(|key| std::env::var(key).ok())
}

/// Read overrides through an arbitrary variable lookup.
pub fn overrides_from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<ConfigOverrides> {
    let worker_path = lookup(WORKER_PATH_ENV).filter(|s| !s.trim().is_empty());

    let timeout_ms = match lookup(TIMEOUT_ENV) {
        Some(raw) if !raw.trim().is_empty() => Some(raw.trim().parse::<u64>().map_err(|e| {
            WardenError::ConfigError(format!("{TIMEOUT_ENV} must be a number of milliseconds (got {raw:?}): {e}"))
        })?),
        _ => None,
    };

    Ok(ConfigOverrides {
        worker_path,
        timeout_ms,
    })
}

/// Default config path: `Scoutwarden.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Scoutwarden.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn missing_optional_file_uses_defaults() {
        let cfg = load_and_validate(
            "/definitely/not/here/Scoutwarden.toml",
            false,
            &ConfigOverrides::default(),
        )
        .unwrap();
        assert_eq!(cfg.timing.timeout_ms, 600_000);
        assert_eq!(cfg.worker.name, "ccr");
        assert!(cfg.worker.path.is_none());
    }

    #[test]
    fn missing_required_file_is_io_error() {
        let res = load_and_validate(
            "/definitely/not/here/Scoutwarden.toml",
            true,
            &ConfigOverrides::default(),
        );
        assert!(matches!(res, Err(WardenError::IoError(_))));
    }

    #[test]
    fn file_values_then_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[worker]
path = "/usr/local/bin/ccr"
args = ["run"]

[timing]
timeout_ms = 5000
grace_period_ms = 10
"#
        )
        .unwrap();

        let cfg = load_and_validate(file.path(), true, &ConfigOverrides::default()).unwrap();
        assert_eq!(cfg.worker.path.as_deref(), Some("/usr/local/bin/ccr"));
        assert_eq!(cfg.worker.args, vec!["run".to_string()]);
        assert_eq!(cfg.timing.timeout_ms, 5000);
        assert_eq!(cfg.timing.grace_period_ms, 10);
        assert_eq!(cfg.timing.poll_interval_ms, 2000);

        let overrides = ConfigOverrides {
            worker_path: Some("  /opt/ccr  ".into()),
            timeout_ms: Some(42),
        };
        let cfg = load_and_validate(file.path(), true, &overrides).unwrap();
        assert_eq!(cfg.worker.path.as_deref(), Some("/opt/ccr"));
        assert_eq!(cfg.timing.timeout_ms, 42);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[timing]\ntimeout = 5\n").unwrap();
        let res = load_and_validate(file.path(), true, &ConfigOverrides::default());
        assert!(matches!(res, Err(WardenError::TomlError(_))));
    }

    #[test]
    fn zero_timeout_override_fails_validation() {
        let overrides = ConfigOverrides {
            worker_path: None,
            timeout_ms: Some(0),
        };
        let res = load_and_validate("/nope/Scoutwarden.toml", false, &overrides);
        assert!(matches!(res, Err(WardenError::ConfigError(_))));
    }

    #[test]
    fn env_overrides() {
        let o = overrides_from_vars(vars(&[
            (WORKER_PATH_ENV, "\"C:\\npm\\ccr.cmd\""),
            (TIMEOUT_ENV, " 1500 "),
        ]))
        .unwrap();
        assert_eq!(o.worker_path.as_deref(), Some("\"C:\\npm\\ccr.cmd\""));
        assert_eq!(o.timeout_ms, Some(1500));

        let o = overrides_from_vars(vars(&[(WORKER_PATH_ENV, "  ")])).unwrap();
        assert_eq!(o, ConfigOverrides::default());

        let err = overrides_from_vars(vars(&[(TIMEOUT_ENV, "10m")])).unwrap_err();
        assert!(err.to_string().contains(TIMEOUT_ENV));
    }
}
