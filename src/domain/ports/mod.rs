//! Port trait definitions (Hexagonal Architecture)
//!
//! Interfaces the engine consumes:
//! - AgentProvider: the external reasoning provider
//! - HistoryStore / CriteriaStore / HaltStore: persistence
//! - CycleSynthesizer: end-of-cycle report and evaluation
//! - EngineObserver: notifications out of the engine

pub mod agent_provider;
pub mod observer;
pub mod stores;
pub mod synthesizer;

pub use agent_provider::{AgentProvider, AgentRequest, ChunkSink};
pub use observer::EngineObserver;
pub use stores::{CriteriaStore, HaltStore, HistoryStore};
pub use synthesizer::{
    CycleSynthesizer, DirectiveRequest, Evaluation, SynthesisReport, SynthesisRequest,
};
