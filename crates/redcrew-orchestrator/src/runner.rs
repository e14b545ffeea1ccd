use crate::ledger::StepRecord;
use crate::manager::{FlowArtifact, Manager};
use crate::plan::{Goal, PipelinePlanner, Planner};
use redcrew_agents::AgentPool;
use redcrew_core::{OrchestrationError, OrchestratorConfig};
use redcrew_store::{ContentStore, ProductStore};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Successful flow result: the complete artifact plus the per-step
/// delegation records.
#[derive(Debug, Clone)]
pub struct FlowReport {
    /// The persisted artifact in its terminal success state.
    pub artifact: FlowArtifact,
    /// Attempt counts and outcomes for every delegation step.
    pub steps: Vec<StepRecord>,
}

/// Structured failure report: identifies the failing step and specialist.
/// A caller never receives a partially populated artifact marked
/// successful — it gets this instead.
#[derive(Debug, Clone)]
pub struct FlowFailure {
    /// What went wrong.
    pub error: OrchestrationError,
    /// Attempt counts and outcomes for every delegation step.
    pub steps: Vec<StepRecord>,
}

impl std::fmt::Display for FlowFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for FlowFailure {}

/// The top-level driver: instantiates a manager per goal, supplies the
/// initial context, and surfaces the final artifact or failure.
pub struct FlowRunner {
    pool: Arc<AgentPool>,
    contents: Arc<dyn ContentStore>,
    products: Arc<dyn ProductStore>,
    planner: Arc<dyn Planner>,
    config: OrchestratorConfig,
}

impl FlowRunner {
    /// Creates a runner over the given pool and stores.
    pub fn new(
        pool: Arc<AgentPool>,
        contents: Arc<dyn ContentStore>,
        products: Arc<dyn ProductStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            pool,
            contents,
            products,
            planner: Arc::new(PipelinePlanner),
            config,
        }
    }

    /// Replaces the decomposition strategy used by every run.
    pub fn with_planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = planner;
        self
    }

    /// Runs a goal to completion or failure.
    pub async fn run(&self, goal: Goal, initial_context: &str) -> Result<FlowReport, FlowFailure> {
        let manager = self.manager();
        let result = manager.run(goal, initial_context).await;
        let steps = manager.ledger().snapshot().await;
        match result {
            Ok(artifact) => Ok(FlowReport { artifact, steps }),
            Err(error) => Err(FlowFailure { error, steps }),
        }
    }

    /// Runs a goal with a cancel signal. On cancellation, in-flight
    /// specialist invocations are best-effort aborted and any not-yet-
    /// committed artifact remains in its last persisted state.
    pub async fn run_with_cancel(
        &self,
        goal: Goal,
        initial_context: &str,
        cancel: watch::Receiver<bool>,
    ) -> Result<FlowReport, FlowFailure> {
        let manager = self.manager();
        tokio::select! {
            result = manager.run(goal, initial_context) => {
                let steps = manager.ledger().snapshot().await;
                match result {
                    Ok(artifact) => Ok(FlowReport { artifact, steps }),
                    Err(error) => Err(FlowFailure { error, steps }),
                }
            }
            () = cancelled(cancel) => {
                info!("flow cancelled");
                let steps = manager.ledger().snapshot().await;
                Err(FlowFailure {
                    error: OrchestrationError::Cancelled,
                    steps,
                })
            }
        }
    }

    fn manager(&self) -> Manager {
        Manager::new(
            Arc::clone(&self.pool),
            Arc::clone(&self.contents),
            Arc::clone(&self.products),
            self.config.clone(),
        )
        .with_planner(Arc::clone(&self.planner))
    }
}

/// Resolves once the cancel flag flips to true. A dropped sender means
/// cancellation can never arrive, so the future stays pending.
async fn cancelled(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
