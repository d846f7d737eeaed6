// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`invocation`] turns the configured worker name (or an explicit path)
//!   into a concrete program plus arguments for the current platform.
//! - [`sinks`] owns the best-effort run logs.
//! - [`backend`] provides the `WorkerRunner` trait and the production
//!   `RealWorkerRunner`, which tests can replace with a fake.

pub mod backend;
pub mod invocation;
pub mod sinks;

pub use backend::{RealWorkerRunner, WorkerRunner};
pub use invocation::{InvocationPlan, InvocationResolver, ResolverEnv};
pub use sinks::{accepted_preface, LogSinks, StartBanner};
