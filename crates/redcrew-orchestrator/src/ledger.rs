use crate::plan::DelegationStep;
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Final (or current) outcome of one delegation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum StepOutcome {
    /// Tracked, not yet dispatched.
    Pending,
    /// At least one attempt in flight.
    Running,
    /// Produced a payload.
    Completed,
    /// Exhausted its attempts (or hit a protocol error).
    Failed {
        /// Why the step failed.
        reason: String,
    },
    /// Optional step that failed and was skipped.
    Skipped {
        /// Why the step was skipped.
        reason: String,
    },
}

/// Attempt count and outcome for one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// Step id.
    pub step_id: Uuid,
    /// Planner-assigned step name.
    pub name: String,
    /// Specialist role the step was delegated to.
    pub role: String,
    /// Attempts spent so far.
    pub attempts: u32,
    /// Current outcome.
    pub outcome: StepOutcome,
}

/// Tracks every delegation and its outcome for one orchestration run, so
/// attempt counts and final outcomes stay retrievable after the run ends.
#[derive(Default)]
pub struct StepLedger {
    records: RwLock<Vec<StepRecord>>,
}

impl StepLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a planned step.
    pub async fn track(&self, step: &DelegationStep) {
        self.records.write().await.push(StepRecord {
            step_id: step.id,
            name: step.name.clone(),
            role: step.role.clone(),
            attempts: 0,
            outcome: StepOutcome::Pending,
        });
    }

    /// Records the start of one attempt.
    pub async fn start_attempt(&self, step_id: Uuid) {
        self.update(step_id, |r| {
            r.attempts += 1;
            r.outcome = StepOutcome::Running;
        })
        .await;
    }

    /// Marks a step completed.
    pub async fn complete(&self, step_id: Uuid) {
        self.update(step_id, |r| r.outcome = StepOutcome::Completed)
            .await;
    }

    /// Marks a step failed.
    pub async fn fail(&self, step_id: Uuid, reason: String) {
        self.update(step_id, |r| r.outcome = StepOutcome::Failed { reason })
            .await;
    }

    /// Marks an optional step skipped.
    pub async fn skip(&self, step_id: Uuid, reason: String) {
        self.update(step_id, |r| r.outcome = StepOutcome::Skipped { reason })
            .await;
    }

    /// Snapshot of every record, in planning order.
    pub async fn snapshot(&self) -> Vec<StepRecord> {
        self.records.read().await.clone()
    }

    /// The record for one step.
    pub async fn record(&self, step_id: Uuid) -> Option<StepRecord> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.step_id == step_id)
            .cloned()
    }

    async fn update(&self, step_id: Uuid, f: impl FnOnce(&mut StepRecord)) {
        let mut records = self.records.write().await;
        if let Some(record) = records.iter_mut().find(|r| r.step_id == step_id) {
            f(record);
        }
    }
}
