//! converge-engine — deadline-bounded readiness polling and rollout
//! orchestration.
//!
//! The waiter drives repeated queries through the predicate evaluator
//! with a wall-clock deadline, a consecutive-failure streak threshold,
//! and cooperative cancellation. The orchestrator sequences batches of
//! waits, aggregating pass/fail across the set.
//!
//! # Components
//!
//! - **`waiter`** — the poll loop for a single wait spec
//! - **`orchestrator`** — ordered batches, fail-fast vs. run-all,
//!   parallel independent groups

pub mod orchestrator;
pub mod waiter;

pub use orchestrator::{FailurePolicy, Orchestrator};
pub use waiter::Waiter;
