use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::domain::errors::EngineResult;
use crate::domain::models::{CycleConfig, CyclePhase, DispatcherConfig};
use crate::domain::ports::{
    AgentProvider, CriteriaStore, CycleSynthesizer, HaltStore, HistoryStore,
};
use crate::infrastructure::storage::{
    InMemoryCriteriaStore, InMemoryHaltStore, InMemoryHistoryStore,
};
use crate::services::dispatcher::Dispatcher;
use crate::services::observer_registry::ObserverRegistry;
use crate::services::synthesis::ProviderSynthesizer;
use crate::services::tick_scheduler::TickScheduler;

use super::{CycleEngine, EngineState, Inner};

/// Assembles a [`CycleEngine`] from its collaborators.
///
/// Stores default to in-memory implementations and the synthesizer to
/// [`ProviderSynthesizer`] over the same provider and dispatcher.
pub struct CycleEngineBuilder {
    provider: Arc<dyn AgentProvider>,
    cycle: CycleConfig,
    dispatcher: DispatcherConfig,
    history: Option<Arc<dyn HistoryStore>>,
    criteria: Option<Arc<dyn CriteriaStore>>,
    halt: Option<Arc<dyn HaltStore>>,
    synthesizer: Option<Arc<dyn CycleSynthesizer>>,
    observers: ObserverRegistry,
}

impl CycleEngineBuilder {
    /// Builder with default configuration and in-memory stores.
    pub fn new(provider: Arc<dyn AgentProvider>) -> Self {
        Self {
            provider,
            cycle: CycleConfig::default(),
            dispatcher: DispatcherConfig::default(),
            history: None,
            criteria: None,
            halt: None,
            synthesizer: None,
            observers: ObserverRegistry::new(),
        }
    }

    /// Timing for continuous cycles.
    #[must_use]
    pub fn with_cycle_config(mut self, config: CycleConfig) -> Self {
        self.cycle = config;
        self
    }

    /// Concurrency and spacing for provider calls.
    #[must_use]
    pub fn with_dispatcher_config(mut self, config: DispatcherConfig) -> Self {
        self.dispatcher = config;
        self
    }

    /// Where cycle records are kept.
    #[must_use]
    pub fn with_history_store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(store);
        self
    }

    /// Where fail-safe criteria are loaded from and saved to.
    #[must_use]
    pub fn with_criteria_store(mut self, store: Arc<dyn CriteriaStore>) -> Self {
        self.criteria = Some(store);
        self
    }

    /// Keep unacknowledged halts here. A halt found on build starts the engine `Halted`.
    #[must_use]
    pub fn with_halt_store(mut self, store: Arc<dyn HaltStore>) -> Self {
        self.halt = Some(store);
        self
    }

    /// Replace the provider-backed synthesizer.
    #[must_use]
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn CycleSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Share an existing registry, e.g. one already holding observers.
    #[must_use]
    pub fn with_observers(mut self, observers: ObserverRegistry) -> Self {
        self.observers = observers;
        self
    }

    /// Build the engine, loading the stored fail-safe criteria and any outstanding halt.
    pub async fn build(self) -> EngineResult<CycleEngine> {
        let dispatcher = Dispatcher::new(&self.dispatcher, self.observers.clone());
        let scheduler = TickScheduler::new(
            Arc::clone(&self.provider),
            dispatcher.clone(),
            self.observers.clone(),
        );
        let synthesizer = self.synthesizer.unwrap_or_else(|| {
            Arc::new(ProviderSynthesizer::new(
                Arc::clone(&self.provider),
                dispatcher.clone(),
            ))
        });
        let history = self
            .history
            .unwrap_or_else(|| Arc::new(InMemoryHistoryStore::new()));
        let criteria_store = self
            .criteria
            .unwrap_or_else(|| Arc::new(InMemoryCriteriaStore::new()));

        let halt_store = self
            .halt
            .unwrap_or_else(|| Arc::new(InMemoryHaltStore::new()));

        let criteria = criteria_store.load().await?;
        criteria.validate()?;
        let mut state = EngineState::new(criteria);
        if let Some(report) = halt_store.load().await? {
            warn!(
                criterion = %report.triggered_criterion,
                "outstanding halt found, acknowledge it before the next cycle"
            );
            state.cycle.phase = CyclePhase::Halted;
            state.cycle.halted = true;
            state.report = Some(report);
        }

        Ok(CycleEngine {
            inner: Arc::new(Inner {
                config: self.cycle,
                scheduler,
                dispatcher,
                synthesizer,
                history,
                criteria_store,
                halt_store,
                observers: self.observers,
                state: Mutex::new(state),
                driver: tokio::sync::Mutex::new(None),
            }),
        })
    }
}
