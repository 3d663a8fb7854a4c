//! The resource query boundary.
//!
//! `ResourceQuery` abstracts "get the current status of a named
//! resource collection in a scope" away from any concrete
//! orchestration API. The engine only ever sees typed snapshots, so a
//! real cluster binding and the in-memory fake are interchangeable.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::error::AdapterError;
use crate::types::{ResourceKind, ResourceSnapshot};

/// One read of cluster state.
///
/// Implementations issue exactly one external read per invocation and
/// never retry internally — retry policy belongs to the waiter.
/// An absent resource is a valid empty result, not an error; a
/// resource disappearing between enumeration and detail fetch is
/// reported as absent.
pub trait ResourceQuery: Send + Sync {
    /// Snapshot every resource of `kind` in `scope`, optionally
    /// narrowed to a single name.
    fn query(
        &self,
        scope: &str,
        kind: ResourceKind,
        name_filter: Option<&str>,
    ) -> impl Future<Output = Result<Vec<ResourceSnapshot>, AdapterError>> + Send;
}

// ── In-memory fake ─────────────────────────────────────────────────

type Step = Result<Vec<ResourceSnapshot>, AdapterError>;

#[derive(Default)]
struct Script {
    /// Remaining scripted steps, consumed one per poll.
    steps: Vec<Step>,
    /// Repeated once the scripted steps run out.
    last: Option<Step>,
    /// Number of queries served for this (scope, kind).
    polls: u64,
}

/// Scripted in-memory `ResourceQuery` for tests and dry runs.
///
/// Each (scope, kind) pair holds an ordered sequence of query results;
/// every poll consumes one step and the final step repeats forever.
/// Unscripted pairs answer with an empty result (absent).
#[derive(Clone, Default)]
pub struct MemoryQuery {
    scripts: Arc<Mutex<HashMap<(String, ResourceKind), Script>>>,
}

impl MemoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the result sequence for one (scope, kind) pair.
    pub fn script(&self, scope: &str, kind: ResourceKind, mut steps: Vec<Step>) {
        // Stored in reverse so each poll can pop the next step.
        steps.reverse();
        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        scripts.insert(
            (scope.to_string(), kind),
            Script {
                steps,
                last: None,
                polls: 0,
            },
        );
    }

    /// Script a constant result for one (scope, kind) pair.
    pub fn script_constant(&self, scope: &str, kind: ResourceKind, step: Step) {
        self.script(scope, kind, vec![step]);
    }

    /// How many queries this fake has served for a (scope, kind) pair.
    pub fn polls(&self, scope: &str, kind: ResourceKind) -> u64 {
        let scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        scripts
            .get(&(scope.to_string(), kind))
            .map(|s| s.polls)
            .unwrap_or(0)
    }

    fn next_step(&self, scope: &str, kind: ResourceKind) -> Step {
        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        let script = scripts
            .entry((scope.to_string(), kind))
            .or_default();
        script.polls += 1;
        match script.steps.pop() {
            Some(step) => {
                script.last = Some(step.clone());
                step
            }
            None => script.last.clone().unwrap_or_else(|| Ok(Vec::new())),
        }
    }
}

impl ResourceQuery for MemoryQuery {
    async fn query(
        &self,
        scope: &str,
        kind: ResourceKind,
        name_filter: Option<&str>,
    ) -> Result<Vec<ResourceSnapshot>, AdapterError> {
        let mut snapshots = self.next_step(scope, kind)?;
        if let Some(name) = name_filter {
            snapshots.retain(|s| s.resource.name == name);
        }
        Ok(snapshots)
    }
}
