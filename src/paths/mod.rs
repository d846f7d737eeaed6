// src/paths/mod.rs

//! Task-path conventions.
//!
//! - [`derive`] maps a task file to its result and log locations.
//! - [`resolve`] turns raw front-end input into an absolute task file.

pub mod derive;
pub mod resolve;

pub use derive::{
    latest_log_path_for, log_path_for, log_path_for_at, project_root_for, result_path_for,
    DerivedLocations,
};
pub use resolve::TaskResolver;
