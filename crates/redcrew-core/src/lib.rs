//! Core types and error definitions for the Redcrew orchestration system.
//!
//! This crate provides the foundational types shared across all Redcrew
//! crates: the error taxonomy, specialist result payloads, and the
//! orchestrator configuration surface.
//!
//! # Main types
//!
//! - [`ProtocolError`] — Delegation message validation and routing failures.
//! - [`AgentError`] — Specialist execution and timeout failures.
//! - [`StateError`] — Artifact state-machine and store failures.
//! - [`OrchestrationError`] — Top-level result returned to the flow runner.
//! - [`Payload`] — The text-or-structured result a specialist produces.
//! - [`OrchestratorConfig`] — Explicit configuration passed into managers.

/// Orchestrator configuration with env-based loading.
pub mod config;
/// Error taxonomy for all Redcrew subsystems.
pub mod error;
/// Specialist result payloads.
pub mod payload;

pub use config::OrchestratorConfig;
pub use error::{
    AgentError, ConfigError, OrchestrationError, ProtocolError, StateError, StepError,
};
pub use payload::Payload;
