//! History, criteria and halt persistence.

mod json_file;
mod memory;

pub use json_file::{JsonFileCriteriaStore, JsonFileHaltStore, JsonFileHistoryStore};
pub use memory::{InMemoryCriteriaStore, InMemoryHaltStore, InMemoryHistoryStore};
