//! The specialist agent pool: named, role-bound workers each exposing a
//! single capability, and the registry the delegation codec routes
//! against.
//!
//! # Main types
//!
//! - [`Specialist`] — The one-capability worker trait.
//! - [`FnSpecialist`] — Adapts a plain async closure into a specialist.
//! - [`AgentPool`] — Role registry with bounded-timeout invocation.
//! - [`roster`] — The production role names.

/// Role registry and invocation.
pub mod pool;
/// Production specialist role names.
pub mod roster;
/// The specialist trait and closure adapter.
pub mod specialist;

pub use pool::AgentPool;
pub use specialist::{FnSpecialist, Specialist};
