//! Hypercycle - autonomous multi-agent workday cycles
//!
//! A team of role-playing agents discusses a goal in rounds, a coordinator
//! synthesizes the discussion into an evolved artifact, a creative team
//! scouts an outside idea, an evaluator scores the cycle, a director reviews
//! it and proposes the next goal, and a fail-safe halts the engine when
//! quality regresses.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and the ports the engine consumes
//! - **Service Layer** (`services`): cycle engine, dispatcher, scheduler, analysis
//! - **Infrastructure Layer** (`infrastructure`): provider client, stores, config, logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hypercycle::{CycleEngine, MockProvider};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = CycleEngine::builder(Arc::new(MockProvider::new())).build().await?;
//!     let outcome = engine.start_single_cycle("Add a scoreboard", "").await?;
//!     println!("{:?}", outcome.phase);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{EngineError, EngineResult, ProviderError, StoreError};
pub use domain::models::{
    Config, CycleOutcome, CyclePhase, CycleState, Directive, FailSafeCriteria, FailSafeReport,
    HistoricalRecord, LogEntry, PerformanceMetrics, Role, WorkdayLog,
};
pub use domain::ports::{
    AgentProvider, AgentRequest, CriteriaStore, CycleSynthesizer, EngineObserver, HaltStore,
    HistoryStore,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::MockProvider;
pub use services::{CycleEngine, CycleEngineBuilder, Dispatcher, PredictionService};
