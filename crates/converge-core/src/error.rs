//! Error types shared across the converge crates.

use thiserror::Error;

/// A single query against the cluster state failed.
///
/// Adapter errors are transient by contract: the waiter retries them
/// up to its consecutive-failure streak threshold. "Resource absent"
/// is never an adapter error — absence is a valid empty query result.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// The query transport could not be reached (connection, auth).
    #[error("transport error: {0}")]
    Transport(String),

    /// The query command ran but reported failure.
    #[error("query command failed: {0}")]
    Command(String),

    /// The status payload could not be interpreted.
    #[error("malformed status payload: {0}")]
    Malformed(String),
}

/// A wait spec or rollout plan was rejected before any query.
///
/// Config errors are never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("poll interval must be non-zero")]
    ZeroPollInterval,

    #[error("target has no kinds to wait on")]
    EmptyKinds,

    #[error("unknown resource kind: {0}")]
    UnknownKind(String),

    #[error("unknown predicate: {0} (expected \"ready\" or \"absent\")")]
    UnknownPredicate(String),

    #[error("invalid duration {0:?}: expected forms like \"500ms\", \"5s\", \"2m\"")]
    InvalidDuration(String),

    #[error("plan has no targets")]
    EmptyPlan,

    #[error("target must set either name+kind or kinds, not both")]
    AmbiguousTarget(String),

    #[error("failed to read plan file: {0}")]
    Io(String),

    #[error("failed to parse plan file: {0}")]
    Parse(String),
}
