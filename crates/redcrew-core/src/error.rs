use std::time::Duration;
use thiserror::Error;

/// Errors raised at the delegation protocol boundary.
///
/// These are always recovered locally by the manager: the offending step is
/// failed immediately and never retried with the same malformed message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The `coworker` field is empty or not a valid role identifier.
    #[error("invalid coworker role {0:?}")]
    InvalidRole(String),

    /// The raw message is not exactly the three recognized string-valued keys.
    #[error("delegation schema violation: {0}")]
    SchemaViolation(String),

    /// The `coworker` role does not resolve to a registered specialist.
    #[error("unknown coworker {0:?}")]
    UnknownCoworker(String),
}

/// Errors raised by a specialist during invocation.
///
/// Retryable up to a configured attempt limit; a timeout is not
/// distinguished from any other execution failure for retry purposes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    /// The specialist failed to produce a result.
    #[error("specialist execution failed: {0}")]
    ExecutionFailed(String),

    /// The invocation exceeded its bounded timeout.
    #[error("specialist invocation timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors raised by the artifact store and its state machines.
///
/// An invalid transition is a programming or ordering bug: it is surfaced
/// to the caller and never silently retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// A transition attempt did not match the state machine's preconditions.
    #[error("invalid transition for {entity} {id}: {from} -> {attempted}")]
    InvalidTransition {
        /// Entity kind ("content" or "product_document").
        entity: &'static str,
        /// Artifact id.
        id: String,
        /// Status the artifact was in.
        from: String,
        /// Transition that was attempted.
        attempted: String,
    },

    /// No artifact with the given id exists.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// Artifact id.
        id: String,
    },

    /// A persistence backend failed below the state machine.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Startup misconfiguration. Raised when the system is wired together,
/// never on the invocation path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A specialist role was registered twice.
    #[error("duplicate specialist role {0:?}")]
    DuplicateRole(String),

    /// A configuration value could not be parsed.
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// Configuration key (env var name).
        key: String,
        /// Why the value was rejected.
        message: String,
    },
}

/// The cause of a single failed delegation step: either the message never
/// made it past the protocol boundary, or the specialist itself failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// Failed at the protocol boundary (validation or routing).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Failed inside the specialist (execution or timeout).
    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// Top-level orchestration failure returned to the flow runner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestrationError {
    /// A required delegation step failed unrecoverably.
    #[error("step {step:?} delegated to {role:?} failed after {attempts} attempt(s): {cause}")]
    StepFailed {
        /// Planner-assigned step name.
        step: String,
        /// Specialist role the step was delegated to.
        role: String,
        /// Number of attempts spent before giving up.
        attempts: u32,
        /// Underlying protocol or agent failure.
        cause: StepError,
    },

    /// Step execution finished but the results could not be aggregated
    /// into a complete artifact.
    #[error("partial aggregation: {0}")]
    PartialAggregation(String),

    /// An artifact store operation failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// The run was cancelled by the flow runner.
    #[error("run cancelled")]
    Cancelled,
}
