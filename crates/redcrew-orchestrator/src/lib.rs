//! The manager/orchestrator: decomposes a goal into delegation steps,
//! routes each step to a named specialist over the strict structured-call
//! protocol, aggregates the results, and drives the artifact store's state
//! machines to completion or failure.
//!
//! # Main types
//!
//! - [`Manager`] — One orchestration run: decompose → delegate → aggregate
//!   → persist.
//! - [`FlowRunner`] — Top-level driver: builds a manager per goal and
//!   surfaces the final artifact or a structured failure report.
//! - [`Goal`] / [`Planner`] / [`PipelinePlanner`] — Pluggable goal
//!   decomposition.
//! - [`StepLedger`] — Attempt count and final outcome per step.

/// Per-step attempt and outcome tracking.
pub mod ledger;
/// The manager and its delegation loop.
pub mod manager;
/// Goals, delegation steps, and planners.
pub mod plan;
/// The top-level flow runner.
pub mod runner;

pub use ledger::{StepLedger, StepOutcome, StepRecord};
pub use manager::{FlowArtifact, Manager};
pub use plan::{DelegationStep, Goal, PipelinePlanner, Planner};
pub use runner::{FlowFailure, FlowReport, FlowRunner};
