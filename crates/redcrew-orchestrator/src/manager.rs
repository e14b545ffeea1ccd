use crate::ledger::StepLedger;
use crate::plan::{DelegationStep, Goal, PipelinePlanner, Planner};
use redcrew_agents::AgentPool;
use redcrew_core::{OrchestrationError, OrchestratorConfig, Payload, StepError};
use redcrew_protocol::Delegation;
use redcrew_store::{
    CompletionMetadata, Content, ContentDraft, ContentStore, ProductDocument, ProductDraft,
    ProductStore,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// The artifact a successful orchestration run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowArtifact {
    /// A content record, persisted as a draft.
    Content(Content),
    /// A product document, persisted as completed.
    Product(ProductDocument),
}

impl FlowArtifact {
    /// The content record, when this is a content artifact.
    pub fn as_content(&self) -> Option<&Content> {
        match self {
            FlowArtifact::Content(content) => Some(content),
            FlowArtifact::Product(_) => None,
        }
    }

    /// The product document, when this is a product artifact.
    pub fn as_product(&self) -> Option<&ProductDocument> {
        match self {
            FlowArtifact::Product(doc) => Some(doc),
            FlowArtifact::Content(_) => None,
        }
    }
}

/// One orchestration run: decomposes a goal into delegation steps, routes
/// each step through the protocol codec to its specialist, aggregates the
/// results, and drives the artifact store to a terminal state.
///
/// Independent steps are dispatched concurrently (bounded by
/// `max_parallel_delegations`); all steps belonging to the artifact are
/// joined before any store transition, so the store never observes a
/// partially-aggregated result.
pub struct Manager {
    pool: Arc<AgentPool>,
    contents: Arc<dyn ContentStore>,
    products: Arc<dyn ProductStore>,
    planner: Arc<dyn Planner>,
    config: OrchestratorConfig,
    ledger: Arc<StepLedger>,
}

impl Manager {
    /// Creates a manager with the default [`PipelinePlanner`].
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
            ledger: Arc::new(StepLedger::new()),
        }
    }

    /// Replaces the decomposition strategy.
    pub fn with_planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = planner;
        self
    }

    /// The ledger tracking attempts and outcomes for this run.
    pub fn ledger(&self) -> &Arc<StepLedger> {
        &self.ledger
    }

    /// Runs the goal to completion or failure.
    pub async fn run(
        &self,
        goal: Goal,
        initial_context: &str,
    ) -> Result<FlowArtifact, OrchestrationError> {
        let steps = self.planner.plan(&goal, initial_context);
        for step in &steps {
            self.ledger.track(step).await;
        }
        info!(goal = goal.kind(), steps = steps.len(), "orchestration started");

        match goal {
            Goal::GenerateContent {
                account_id,
                category,
                ..
            } => {
                self.run_content_flow(&account_id, category.as_deref(), &steps, initial_context)
                    .await
            }
            Goal::BuildProductDocument {
                product_name,
                brand_name,
                ..
            } => {
                self.run_product_flow(
                    &product_name,
                    brand_name.as_deref(),
                    &steps,
                    initial_context,
                )
                .await
            }
        }
    }

    /// Content flow: nothing is persisted until every required delegation
    /// has succeeded, so a failed flow leaves no artifact behind.
    async fn run_content_flow(
        &self,
        account_id: &str,
        category: Option<&str>,
        steps: &[DelegationStep],
        initial_context: &str,
    ) -> Result<FlowArtifact, OrchestrationError> {
        let outputs = self.execute_steps(steps, initial_context).await?;

        let payload = deliverable_payload(steps, &outputs).ok_or_else(|| {
            OrchestrationError::PartialAggregation("no deliverable payload produced".into())
        })?;

        let mut draft = ContentDraft::new(derive_title(payload), account_id)
            .with_body(payload.as_text());
        if let Some(category) = category {
            draft = draft.with_category(category);
        }

        let content = self.contents.create(draft).await?;
        info!(id = %content.id, account_id = %content.account_id, "content flow complete");
        Ok(FlowArtifact::Content(content))
    }

    /// Product flow: the document is created up front (processing) and
    /// driven to completed or failed once all steps have joined.
    async fn run_product_flow(
        &self,
        product_name: &str,
        brand_name: Option<&str>,
        steps: &[DelegationStep],
        initial_context: &str,
    ) -> Result<FlowArtifact, OrchestrationError> {
        let mut draft = ProductDraft::new(product_name);
        if let Some(brand_name) = brand_name {
            draft = draft.with_brand(brand_name);
        }
        let doc = self.products.create(draft).await?;

        let outputs = match self.execute_steps(steps, initial_context).await {
            Ok(outputs) => outputs,
            Err(err) => {
                self.fail_document(&doc.id, &err).await;
                return Err(err);
            }
        };

        let Some(payload) = deliverable_payload(steps, &outputs) else {
            let err =
                OrchestrationError::PartialAggregation("no deliverable payload produced".into());
            self.fail_document(&doc.id, &err).await;
            return Err(err);
        };

        let metadata = CompletionMetadata {
            summary: payload.first_line(),
            ..Default::default()
        };
        let doc = self
            .products
            .complete(&doc.id, payload.as_text(), metadata)
            .await?;
        info!(id = %doc.id, product = %doc.product_name, "product flow complete");
        Ok(FlowArtifact::Product(doc))
    }

    async fn fail_document(&self, id: &str, cause: &OrchestrationError) {
        if let Err(store_err) = self.products.fail(id, cause.to_string()).await {
            error!(id = %id, error = %store_err, "failed to mark document as failed");
        }
    }

    /// Dispatches all steps respecting dependencies. Steps whose
    /// dependencies are all satisfied run concurrently; a required step
    /// failure drains the in-flight batch and aborts the run.
    async fn execute_steps(
        &self,
        steps: &[DelegationStep],
        initial_context: &str,
    ) -> Result<HashMap<Uuid, Payload>, OrchestrationError> {
        let mut outputs: HashMap<Uuid, Payload> = HashMap::new();
        let mut satisfied: Vec<Uuid> = Vec::new();
        let mut finished: HashSet<Uuid> = HashSet::new();

        while finished.len() < steps.len() {
            let ready: Vec<DelegationStep> = steps
                .iter()
                .filter(|s| !finished.contains(&s.id) && s.is_ready(&satisfied))
                .cloned()
                .collect();

            if ready.is_empty() {
                warn!("steps remain but none are ready");
                return Err(OrchestrationError::PartialAggregation(
                    "steps remain with unsatisfiable dependencies".into(),
                ));
            }

            for batch in ready.chunks(self.config.max_parallel_delegations.max(1)) {
                let mut join_set = JoinSet::new();
                for step in batch {
                    let step = step.clone();
                    let context = build_context(initial_context, &step, steps, &outputs);
                    let pool = Arc::clone(&self.pool);
                    let ledger = Arc::clone(&self.ledger);
                    let config = self.config.clone();
                    join_set.spawn(async move {
                        let result = execute_step(&pool, &ledger, &config, &step, &context).await;
                        (step, result)
                    });
                }

                while let Some(joined) = join_set.join_next().await {
                    let (step, result) = joined.map_err(|e| {
                        OrchestrationError::PartialAggregation(format!("step task aborted: {e}"))
                    })?;
                    finished.insert(step.id);

                    match result {
                        Ok(payload) => {
                            self.ledger.complete(step.id).await;
                            satisfied.push(step.id);
                            outputs.insert(step.id, payload);
                        }
                        Err((attempts, cause)) if step.required => {
                            self.ledger.fail(step.id, cause.to_string()).await;
                            // join the rest of the batch before surfacing
                            // the failure, so no step is left mid-flight
                            while let Some(other) = join_set.join_next().await {
                                if let Ok((other_step, other_result)) = other {
                                    finished.insert(other_step.id);
                                    match other_result {
                                        Ok(payload) => {
                                            self.ledger.complete(other_step.id).await;
                                            satisfied.push(other_step.id);
                                            outputs.insert(other_step.id, payload);
                                        }
                                        Err((_, other_cause)) => {
                                            self.ledger
                                                .fail(other_step.id, other_cause.to_string())
                                                .await;
                                        }
                                    }
                                }
                            }
                            return Err(OrchestrationError::StepFailed {
                                step: step.name.clone(),
                                role: step.role.clone(),
                                attempts,
                                cause,
                            });
                        }
                        Err((_, cause)) => {
                            warn!(step = %step.name, error = %cause, "optional step failed; skipped");
                            self.ledger.skip(step.id, cause.to_string()).await;
                            satisfied.push(step.id);
                        }
                    }
                }
            }
        }

        Ok(outputs)
    }
}

/// Executes one step: validates the delegation through the codec, routes
/// it to the pool, and retries agent failures with exponential backoff.
/// Protocol errors fail the step immediately — a malformed structured
/// call is a content problem, not a transient fault.
async fn execute_step(
    pool: &AgentPool,
    ledger: &StepLedger,
    config: &OrchestratorConfig,
    step: &DelegationStep,
    context: &str,
) -> Result<Payload, (u32, StepError)> {
    let message = Delegation::encode(&step.role, &step.task, context)
        .map_err(|e| (0, StepError::from(e)))?;
    // round-trip through the wire shape so anything a planner smuggled in
    // is rejected before a specialist ever runs
    let message =
        Delegation::decode(&message.to_value()).map_err(|e| (0, StepError::from(e)))?;

    let mut attempts = 0u32;
    loop {
        attempts += 1;
        ledger.start_attempt(step.id).await;
        debug!(step = %step.name, role = %step.role, attempt = attempts, "dispatching delegation");

        match pool.invoke(&message).await {
            Ok(payload) => {
                debug!(step = %step.name, "delegation succeeded");
                return Ok(payload);
            }
            Err(err @ StepError::Protocol(_)) => return Err((attempts, err)),
            Err(StepError::Agent(err)) => {
                if attempts >= config.max_attempts {
                    return Err((attempts, StepError::Agent(err)));
                }
                let delay = config.backoff_for(attempts);
                warn!(
                    step = %step.name,
                    attempt = attempts,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "delegation failed; retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Initial context plus the rendered output of every dependency.
fn build_context(
    initial: &str,
    step: &DelegationStep,
    steps: &[DelegationStep],
    outputs: &HashMap<Uuid, Payload>,
) -> String {
    let mut context = initial.to_string();
    for dep_id in &step.depends_on {
        let dep = steps.iter().find(|s| s.id == *dep_id);
        if let (Some(dep), Some(payload)) = (dep, outputs.get(dep_id)) {
            context.push_str("\n\n[");
            context.push_str(&dep.role);
            context.push_str("] ");
            context.push_str(&dep.name);
            context.push_str(":\n");
            context.push_str(&payload.as_text());
        }
    }
    context
}

/// The payload that becomes the artifact body: the last deliverable step
/// with an output, falling back to the last step that produced anything.
fn deliverable_payload<'a>(
    steps: &[DelegationStep],
    outputs: &'a HashMap<Uuid, Payload>,
) -> Option<&'a Payload> {
    steps
        .iter()
        .rev()
        .find(|s| s.deliverable && outputs.contains_key(&s.id))
        .or_else(|| steps.iter().rev().find(|s| outputs.contains_key(&s.id)))
        .and_then(|s| outputs.get(&s.id))
}

/// Title for a generated content record: the payload's first non-empty
/// line, capped at 80 characters.
fn derive_title(payload: &Payload) -> String {
    let line = payload
        .first_line()
        .unwrap_or_else(|| "Untitled".to_string());
    line.chars().take(80).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_title_first_line() {
        let payload = Payload::text("A headline\nand a body");
        assert_eq!(derive_title(&payload), "A headline");
    }

    #[test]
    fn test_derive_title_caps_length() {
        let payload = Payload::text("x".repeat(200));
        assert_eq!(derive_title(&payload).chars().count(), 80);
    }

    #[test]
    fn test_derive_title_empty_payload() {
        assert_eq!(derive_title(&Payload::text("")), "Untitled");
    }

    #[test]
    fn test_build_context_appends_dependency_outputs() {
        let analysis = DelegationStep::new("analysis", "analyst", "t");
        let writing =
            DelegationStep::new("writing", "creator", "t").with_dependencies(vec![analysis.id]);
        let steps = vec![analysis.clone(), writing.clone()];

        let mut outputs = HashMap::new();
        outputs.insert(analysis.id, Payload::text("trends: A, B"));

        let context = build_context("account=a1", &writing, &steps, &outputs);
        assert!(context.starts_with("account=a1"));
        assert!(context.contains("[analyst] analysis:"));
        assert!(context.contains("trends: A, B"));
    }

    #[test]
    fn test_deliverable_payload_prefers_marked_step() {
        let a = DelegationStep::new("a", "r", "t").deliverable();
        let b = DelegationStep::new("b", "r", "t");
        let steps = vec![a.clone(), b.clone()];
        let mut outputs = HashMap::new();
        outputs.insert(a.id, Payload::text("the body"));
        outputs.insert(b.id, Payload::text("a review"));

        let payload = deliverable_payload(&steps, &outputs).unwrap();
        assert_eq!(payload.as_text(), "the body");
    }

    #[test]
    fn test_deliverable_payload_falls_back_to_last_output() {
        let a = DelegationStep::new("a", "r", "t");
        let b = DelegationStep::new("b", "r", "t");
        let steps = vec![a.clone(), b.clone()];
        let mut outputs = HashMap::new();
        outputs.insert(a.id, Payload::text("first"));
        outputs.insert(b.id, Payload::text("second"));

        let payload = deliverable_payload(&steps, &outputs).unwrap();
        assert_eq!(payload.as_text(), "second");
    }
}
