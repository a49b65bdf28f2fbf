//! Domain layer for the Hypercycle engine
//!
//! Core models, error types and the ports that infrastructure adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{EngineError, EngineResult, ProviderError, StoreError};
