// src/config/mod.rs

//! Configuration loading and validation for scoutwarden.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and layer env/CLI overrides (`loader.rs`).
//! - Validate basic invariants like non-zero timings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, overrides_from_env};
pub use model::{
    ConfigFile, ConfigOverrides, LayoutSection, RawConfigFile, TimingSection, WorkerSection,
};
pub use validate::validate_config;
