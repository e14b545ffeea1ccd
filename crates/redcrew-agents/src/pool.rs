use crate::specialist::Specialist;
use parking_lot::RwLock;
use redcrew_core::{
    AgentError, ConfigError, OrchestratorConfig, Payload, ProtocolError, StepError,
};
use redcrew_protocol::Delegation;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Registry of specialists keyed by role name.
///
/// Populated at startup and read-mostly afterwards — invocation takes a
/// read lock only long enough to clone the `Arc`. Role uniqueness is
/// enforced at registration; a duplicate is a wiring bug, not a runtime
/// condition.
pub struct AgentPool {
    specialists: RwLock<HashMap<String, Arc<dyn Specialist>>>,
    invoke_timeout: Duration,
}

impl AgentPool {
    /// Creates an empty pool with the given per-invocation timeout.
    pub fn new(invoke_timeout: Duration) -> Self {
        Self {
            specialists: RwLock::new(HashMap::new()),
            invoke_timeout,
        }
    }

    /// Creates an empty pool using the configured invocation timeout.
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self::new(config.invoke_timeout())
    }

    /// Registers a specialist under its role name.
    pub fn register(&self, specialist: Arc<dyn Specialist>) -> Result<(), ConfigError> {
        let role = specialist.role().to_string();
        let mut specialists = self.specialists.write();
        if specialists.contains_key(&role) {
            return Err(ConfigError::DuplicateRole(role));
        }
        info!(role = %role, "registered specialist");
        specialists.insert(role, specialist);
        Ok(())
    }

    /// Resolves a role name against the registry.
    pub fn resolve(&self, role: &str) -> Result<Arc<dyn Specialist>, ProtocolError> {
        self.specialists
            .read()
            .get(role)
            .cloned()
            .ok_or_else(|| ProtocolError::UnknownCoworker(role.to_string()))
    }

    /// The registered role names, sorted.
    pub fn roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = self.specialists.read().keys().cloned().collect();
        roles.sort();
        roles
    }

    /// Number of registered specialists.
    pub fn len(&self) -> usize {
        self.specialists.read().len()
    }

    /// Whether the pool has no specialists.
    pub fn is_empty(&self) -> bool {
        self.specialists.read().is_empty()
    }

    /// Routes a validated delegation to its specialist and executes it
    /// under the pool's timeout. Exceeding the timeout is an
    /// [`AgentError::Timeout`]; no retry happens here.
    pub async fn invoke(&self, delegation: &Delegation) -> Result<Payload, StepError> {
        let specialist = self.resolve(&delegation.coworker)?;
        match tokio::time::timeout(
            self.invoke_timeout,
            specialist.perform(&delegation.task, &delegation.context),
        )
        .await
        {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(err)) => Err(StepError::Agent(err)),
            Err(_) => {
                warn!(role = %delegation.coworker, timeout = ?self.invoke_timeout, "invocation timed out");
                Err(StepError::Agent(AgentError::Timeout(self.invoke_timeout)))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::specialist::FnSpecialist;

    fn echo(role: &str) -> Arc<dyn Specialist> {
        Arc::new(FnSpecialist::new(
            role,
            |task: String, _context: String| async move { Ok(Payload::text(task)) },
        ))
    }

    #[test]
    fn test_register_and_resolve() {
        let pool = AgentPool::new(Duration::from_secs(1));
        pool.register(echo("chief_market_analyst")).unwrap();
        assert!(pool.resolve("chief_market_analyst").is_ok());
        assert_eq!(pool.roles(), vec!["chief_market_analyst"]);
    }

    #[test]
    fn test_duplicate_role_is_config_error() {
        let pool = AgentPool::new(Duration::from_secs(1));
        pool.register(echo("creator")).unwrap();
        let err = pool.register(echo("creator")).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateRole("creator".into()));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_resolve_unknown_role() {
        let pool = AgentPool::new(Duration::from_secs(1));
        let err = pool.resolve("ghost").err().unwrap();
        assert_eq!(err, ProtocolError::UnknownCoworker("ghost".into()));
    }

    #[tokio::test]
    async fn test_invoke_routes_to_specialist() {
        let pool = AgentPool::new(Duration::from_secs(1));
        pool.register(echo("creator")).unwrap();
        let delegation = Delegation::encode("creator", "write a post", "ctx").unwrap();
        let payload = pool.invoke(&delegation).await.unwrap();
        assert_eq!(payload.as_text(), "write a post");
    }

    #[tokio::test]
    async fn test_invoke_unknown_coworker_is_protocol_error() {
        let pool = AgentPool::new(Duration::from_secs(1));
        let delegation = Delegation::encode("unknown_role", "t", "c").unwrap();
        let err = pool.invoke(&delegation).await.unwrap_err();
        assert!(matches!(
            err,
            StepError::Protocol(ProtocolError::UnknownCoworker(_))
        ));
    }

    #[tokio::test]
    async fn test_invoke_times_out() {
        let pool = AgentPool::new(Duration::from_millis(20));
        pool.register(Arc::new(FnSpecialist::new(
            "slow",
            |_task: String, _context: String| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Payload::text("too late"))
            },
        )))
        .unwrap();

        let delegation = Delegation::encode("slow", "t", "c").unwrap();
        let err = pool.invoke(&delegation).await.unwrap_err();
        assert!(matches!(err, StepError::Agent(AgentError::Timeout(_))));
    }
}
