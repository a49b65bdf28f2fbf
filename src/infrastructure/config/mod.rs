//! Configuration loading
//!
//! Layered configuration using figment:
//! - Programmatic defaults
//! - `.hypercycle/config.yaml` and `.hypercycle/local.yaml`
//! - `HYPERCYCLE_*` environment overrides

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
