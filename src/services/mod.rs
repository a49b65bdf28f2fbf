pub mod cycle_engine;
pub mod dispatcher;
pub mod fail_safe;
pub mod observer_registry;
pub mod prediction;
pub mod prompts;
pub mod synthesis;
pub mod tick_scheduler;
pub mod trend_analyzer;

pub use cycle_engine::{CycleEngine, CycleEngineBuilder};
pub use dispatcher::Dispatcher;
pub use observer_registry::{ObserverRegistry, SubscriptionId};
pub use prediction::PredictionService;
pub use prompts::{PromptSet, RoundContext};
pub use synthesis::ProviderSynthesizer;
pub use tick_scheduler::{RoundOutcome, TickScheduler};
