// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WardenError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::WardenError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.worker, raw.timing, raw.layout))
    }
}

/// Re-check an already-built config, e.g. after applying overrides.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_raw_config(&RawConfigFile {
        worker: cfg.worker.clone(),
        timing: cfg.timing,
        layout: cfg.layout.clone(),
    })
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_worker(cfg)?;
    validate_timing(cfg)?;
    validate_layout(cfg)?;
    Ok(())
}

fn validate_worker(cfg: &RawConfigFile) -> Result<()> {
    if cfg.worker.name.trim().is_empty() {
        return Err(WardenError::ConfigError(
            "[worker].name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_timing(cfg: &RawConfigFile) -> Result<()> {
    let t = &cfg.timing;
    for (key, value) in [
        ("timeout_ms", t.timeout_ms),
        ("poll_interval_ms", t.poll_interval_ms),
    ] {
        if value == 0 {
            return Err(WardenError::ConfigError(format!(
                "[timing].{key} must be >= 1 (got 0)"
            )));
        }
    }
    Ok(())
}

fn validate_layout(cfg: &RawConfigFile) -> Result<()> {
    if cfg.layout.tasks_dir.trim().is_empty() {
        return Err(WardenError::ConfigError(
            "[layout].tasks_dir must not be empty".to_string(),
        ));
    }
    Ok(())
}
