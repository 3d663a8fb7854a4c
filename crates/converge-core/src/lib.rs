//! converge-core — domain types and boundaries for convergence waits.
//!
//! Defines the resource/wait/outcome data model, pure predicate
//! evaluation, the `ResourceQuery` trait that abstracts the cluster
//! state API (with a scripted in-memory fake), and the `converge.toml`
//! rollout plan parser.
//!
//! The engine that drives these types lives in `converge-engine`; a
//! concrete kubectl-backed query binding lives in `converge-kubectl`.

pub mod config;
pub mod error;
pub mod evaluate;
pub mod query;
pub mod types;

pub use config::{RolloutPlan, parse_duration};
pub use error::{AdapterError, ConfigError};
pub use query::{MemoryQuery, ResourceQuery};
pub use types::*;
