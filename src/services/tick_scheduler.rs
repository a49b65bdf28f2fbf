//! One ordered round of role turns.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::ProviderError;
use crate::domain::models::{Role, WorkdayLog};
use crate::domain::ports::AgentProvider;
use crate::services::dispatcher::Dispatcher;
use crate::services::observer_registry::ObserverRegistry;
use crate::services::prompts::{PromptSet, RoundContext};

/// Log after a round, plus the failure that ended it early.
#[derive(Debug)]
pub struct RoundOutcome {
    /// Log including the entries this round wrote.
    pub log: WorkdayLog,
    /// Failure that ended the round.
    pub error: Option<ProviderError>,
    /// Stopped early by cancellation
    pub cancelled: bool,
}

/// Drives each role through one turn, strictly in order.
#[derive(Clone)]
pub struct TickScheduler {
    provider: Arc<dyn AgentProvider>,
    dispatcher: Dispatcher,
    observers: ObserverRegistry,
    prompts: PromptSet,
}

impl TickScheduler {
    /// Scheduler calling `provider` through `dispatcher`.
    pub fn new(
        provider: Arc<dyn AgentProvider>,
        dispatcher: Dispatcher,
        observers: ObserverRegistry,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            observers,
            prompts: PromptSet,
        }
    }

    /// Run one turn per role, each seeing the log written so far.
    ///
    /// A failed call ends the round: the failing role's entry stays
    /// provisional and later roles are skipped. Cancellation is checked
    /// before every role and ends the round without an error.
    #[instrument(skip_all, fields(roles = roles.len()))]
    pub async fn run_round(
        &self,
        roles: &[Role],
        ctx: &RoundContext,
        mut log: WorkdayLog,
        cancel: &CancellationToken,
    ) -> RoundOutcome {
        for &role in roles {
            if cancel.is_cancelled() {
                info!(%role, "round cancelled");
                return RoundOutcome { log, error: None, cancelled: true };
            }

            let placeholder = log.push_provisional(role);
            self.observers.log_appended(&placeholder);

            let request = self.prompts.turn_request(role, ctx, &log.render());
            let provider = Arc::clone(&self.provider);
            let result = self
                .dispatcher
                .submit(
                    role.display_name(),
                    || async move { provider.invoke(&request).await },
                    Some(cancel),
                )
                .await;

            match result {
                Ok(text) => {
                    let entry = log.settle(role, text.trim());
                    debug!(%role, chars = entry.content.len(), "turn complete");
                    self.observers.log_appended(&entry);
                }
                Err(ProviderError::Aborted) => {
                    log.discard_provisional(role);
                    info!(%role, "turn dropped before it started");
                    return RoundOutcome { log, error: None, cancelled: true };
                }
                Err(err) => {
                    warn!(%role, error = %err, "turn failed, ending round");
                    return RoundOutcome { log, error: Some(err), cancelled: false };
                }
            }
        }

        RoundOutcome { log, error: None, cancelled: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::DispatcherConfig;
    use crate::infrastructure::mock_provider::MockProvider;

    fn scheduler(provider: Arc<MockProvider>) -> TickScheduler {
        let observers = ObserverRegistry::new();
        let dispatcher = Dispatcher::new(
            &DispatcherConfig {
                max_concurrent: 1,
                min_spacing_ms: 0,
            },
            observers.clone(),
        );
        TickScheduler::new(provider, dispatcher, observers)
    }

    const ROLES: [Role; 3] = [Role::Coordinator, Role::CoreLogic, Role::InterfaceDesign];

    #[tokio::test]
    async fn test_round_runs_roles_in_order() {
        let provider = Arc::new(MockProvider::new());
        let outcome = scheduler(provider.clone())
            .run_round(&ROLES, &RoundContext::new("goal", ""), WorkdayLog::new(), &CancellationToken::new())
            .await;

        assert!(outcome.error.is_none());
        let roles: Vec<Role> = outcome.log.entries().iter().map(|e| e.role).collect();
        assert_eq!(roles, ROLES.to_vec());
        assert!(outcome.log.entries().iter().all(|e| !e.provisional));

        let calls = provider.calls();
        assert!(calls[2].user_prompt.contains("[Core Logic Coder]:"));
    }

    #[tokio::test]
    async fn test_failure_keeps_placeholder_and_skips_rest() {
        let provider = Arc::new(
            MockProvider::new().fail_role(Role::CoreLogic, ProviderError::Transient("503".into())),
        );
        let outcome = scheduler(provider.clone())
            .run_round(&ROLES, &RoundContext::default(), WorkdayLog::new(), &CancellationToken::new())
            .await;

        let entries = outcome.log.entries();
        assert_eq!(entries.len(), 2);
        assert!(!entries[0].provisional);
        assert_eq!(entries[1].role, Role::CoreLogic);
        assert!(entries[1].provisional);
        assert!(outcome.error.unwrap().is_transient());
        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_returns_partial_log() {
        let provider = Arc::new(MockProvider::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut log = WorkdayLog::new();
        log.settle(Role::Coordinator, "earlier");
        let outcome = scheduler(provider.clone())
            .run_round(&ROLES, &RoundContext::default(), log, &cancel)
            .await;

        assert!(outcome.cancelled);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.log.len(), 1);
        assert!(provider.calls().is_empty());
    }
}
