//! The poller/waiter engine.
//!
//! Drives repeated queries through the predicate evaluator until the
//! target is satisfied, the wall-clock deadline expires, the query
//! path fails for an unbroken streak of cycles, or the wait is
//! cancelled. The poll-interval sleep is the only suspension point and
//! it races against the cancellation channel, so cancellation is
//! observed within one poll interval.

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use converge_core::error::AdapterError;
use converge_core::evaluate;
use converge_core::query::ResourceQuery;
use converge_core::types::{
    FailureReason, ResourceSnapshot, WaitOutcome, WaitResult, WaitSpec, WaitTarget,
};

/// Consecutive query failures tolerated before a wait turns terminal.
const DEFAULT_FAILURE_STREAK: u32 = 5;

/// Executes individual wait specs against a query adapter.
#[derive(Debug, Clone)]
pub struct Waiter {
    failure_streak: u32,
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Waiter {
    pub fn new() -> Self {
        Self {
            failure_streak: DEFAULT_FAILURE_STREAK,
        }
    }

    /// Override the consecutive-failure streak threshold (minimum 1).
    pub fn with_failure_streak(mut self, streak: u32) -> Self {
        self.failure_streak = streak.max(1);
        self
    }

    /// Poll until `spec` is satisfied or terminal.
    ///
    /// The deadline is wall-clock from wait start, independent of poll
    /// interval drift. A timeout of zero still performs exactly one
    /// query/evaluate cycle. Satisfaction returns immediately, with no
    /// extra polls. A successful query resets the failure streak.
    pub async fn wait<Q: ResourceQuery>(
        &self,
        spec: &WaitSpec,
        query: &Q,
        mut cancel: watch::Receiver<bool>,
    ) -> WaitOutcome {
        let started = Instant::now();

        if let Err(e) = spec.validate() {
            warn!(waiting_for = %spec.target, error = %e, "rejecting invalid wait spec");
            return finish(
                spec,
                WaitResult::Failed {
                    reason: FailureReason::InvalidSpec {
                        message: e.to_string(),
                    },
                },
                started,
                Vec::new(),
            );
        }

        let mut consecutive_failures: u32 = 0;
        let mut last_snapshots: Vec<ResourceSnapshot> = Vec::new();

        loop {
            if *cancel.borrow() {
                info!(waiting_for = %spec.target, "wait cancelled");
                return finish(spec, cancelled(), started, last_snapshots);
            }

            match observe(spec, query).await {
                Ok(snapshots) => {
                    consecutive_failures = 0;
                    let (ready, desired) = evaluate::totals(&snapshots);
                    debug!(
                        waiting_for = %spec.target,
                        predicate = %spec.predicate,
                        ready,
                        desired,
                        observed = snapshots.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "poll cycle"
                    );
                    let done = evaluate::all_satisfied(&snapshots, spec.predicate);
                    last_snapshots = snapshots;
                    if done {
                        info!(
                            waiting_for = %spec.target,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "target satisfied"
                        );
                        return finish(spec, WaitResult::Satisfied, started, last_snapshots);
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    warn!(
                        waiting_for = %spec.target,
                        error = %e,
                        streak = consecutive_failures,
                        threshold = self.failure_streak,
                        "query failed"
                    );
                    if consecutive_failures >= self.failure_streak {
                        return finish(
                            spec,
                            WaitResult::Failed {
                                reason: FailureReason::Query {
                                    message: e.to_string(),
                                    consecutive_failures,
                                },
                            },
                            started,
                            last_snapshots,
                        );
                    }
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= spec.timeout {
                warn!(
                    waiting_for = %spec.target,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "wait timed out"
                );
                return finish(spec, WaitResult::TimedOut, started, last_snapshots);
            }

            // Never sleep past the deadline. The wake time is fixed
            // up front so channel activity that is not a cancellation
            // cannot shorten the interval.
            let delay = spec.poll_interval.min(spec.timeout - elapsed);
            let wake = Instant::now() + delay;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep_until(wake) => break,
                    changed = cancel.changed() => {
                        match changed {
                            Ok(()) => {
                                if *cancel.borrow() {
                                    info!(waiting_for = %spec.target, "wait cancelled");
                                    return finish(spec, cancelled(), started, last_snapshots);
                                }
                                // Not a cancellation: keep sleeping
                                // toward the same wake time.
                            }
                            // Sender gone: cancellation can no longer
                            // arrive, finish the interval normally.
                            Err(_) => {
                                tokio::time::sleep_until(wake).await;
                                break;
                            }
                        }
                    }
                }
            }
        }
    }
}

fn cancelled() -> WaitResult {
    WaitResult::Failed {
        reason: FailureReason::Cancelled,
    }
}

fn finish(
    spec: &WaitSpec,
    result: WaitResult,
    started: Instant,
    last_snapshots: Vec<ResourceSnapshot>,
) -> WaitOutcome {
    WaitOutcome {
        target: spec.target.clone(),
        result,
        elapsed: started.elapsed(),
        last_snapshots,
    }
}

/// One query cycle: expand the target into adapter calls and collect
/// the snapshot set.
///
/// A named target that the adapter reports as empty becomes a single
/// absent snapshot, so absence predicates evaluate naturally and
/// diagnostics still name the resource.
async fn observe<Q: ResourceQuery>(
    spec: &WaitSpec,
    query: &Q,
) -> Result<Vec<ResourceSnapshot>, AdapterError> {
    match &spec.target {
        WaitTarget::Named(resource) => {
            let snapshots = query
                .query(&resource.scope, resource.kind, Some(&resource.name))
                .await?;
            if snapshots.is_empty() {
                Ok(vec![ResourceSnapshot::absent(resource.clone())])
            } else {
                Ok(snapshots)
            }
        }
        WaitTarget::Kinds { scope, kinds } => {
            let mut all = Vec::new();
            for kind in kinds {
                all.extend(query.query(scope, *kind, None).await?);
            }
            Ok(all)
        }
    }
}
