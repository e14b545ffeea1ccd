use async_trait::async_trait;
use redcrew_core::{AgentError, Payload};
use std::future::Future;

/// A role-bound worker exposing a single capability: consume a task
/// description and context, produce a payload or fail.
///
/// Specialists never persist state themselves, and the pool never retries
/// them internally — retry policy belongs to the manager. Implementations
/// typically wrap an LLM call; that integration lives with the embedder.
#[async_trait]
pub trait Specialist: Send + Sync {
    /// The role name this specialist answers to.
    fn role(&self) -> &str;

    /// Executes one task.
    async fn perform(&self, task: &str, context: &str) -> Result<Payload, AgentError>;
}

/// Adapts a plain async closure into a [`Specialist`].
pub struct FnSpecialist<F> {
    role: String,
    capability: F,
}

impl<F, Fut> FnSpecialist<F>
where
    F: Fn(String, String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Payload, AgentError>> + Send,
{
    /// Wraps `capability` as the specialist for `role`.
    pub fn new(role: impl Into<String>, capability: F) -> Self {
        Self {
            role: role.into(),
            capability,
        }
    }
}

#[async_trait]
impl<F, Fut> Specialist for FnSpecialist<F>
where
    F: Fn(String, String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Payload, AgentError>> + Send,
{
    fn role(&self) -> &str {
        &self.role
    }

    async fn perform(&self, task: &str, context: &str) -> Result<Payload, AgentError> {
        (self.capability)(task.to_string(), context.to_string()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_specialist_passes_task_and_context() {
        let specialist = FnSpecialist::new("echo", |task: String, context: String| async move {
            Ok(Payload::text(format!("{task}|{context}")))
        });
        assert_eq!(specialist.role(), "echo");
        let payload = specialist.perform("t", "c").await.unwrap();
        assert_eq!(payload.as_text(), "t|c");
    }

    #[tokio::test]
    async fn test_fn_specialist_propagates_failure() {
        let specialist = FnSpecialist::new("broken", |_task: String, _context: String| async {
            Err(AgentError::ExecutionFailed("no upstream".into()))
        });
        let err = specialist.perform("t", "c").await.unwrap_err();
        assert!(matches!(err, AgentError::ExecutionFailed(_)));
    }
}
