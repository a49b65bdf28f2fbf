pub mod analysis;
pub mod config;
pub mod creative;
pub mod cycle;
pub mod directive;
pub mod fail_safe;
pub mod history;
pub mod log;
pub mod metrics;
pub mod role;

pub use analysis::{
    Anomaly, GrowthClass, PredictiveAnalysis, PredictiveNarrative, Trend, TrendDirection,
};
pub use config::{
    Config, CycleConfig, DispatcherConfig, LogFormat, LoggingConfig, ProviderConfig,
    RotationPolicy, StorageConfig,
};
pub use creative::{CreativeReview, Verdict};
pub use cycle::{CycleOutcome, CyclePhase, CycleState, QueueSnapshot};
pub use directive::{Directive, PromptChange};
pub use fail_safe::{FailSafeCriteria, FailSafeCriterion, FailSafeReport};
pub use history::HistoricalRecord;
pub use log::{LogEntry, WorkdayLog};
pub use metrics::{MetricName, PerformanceMetrics};
pub use role::{Division, Role, ROUND_ROLES};
