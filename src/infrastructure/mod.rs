//! Infrastructure layer module
//!
//! Adapters for the domain ports and process-level concerns:
//! - OpenRouter provider client
//! - Scripted provider for offline runs and tests
//! - JSON-file and in-memory stores
//! - Configuration and logging

pub mod config;
pub mod logging;
pub mod mock_provider;
pub mod openrouter;
pub mod storage;

pub use mock_provider::MockProvider;
