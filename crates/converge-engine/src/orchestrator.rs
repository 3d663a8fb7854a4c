//! Rollout orchestrator — sequences wait specs and aggregates outcomes.
//!
//! Targets within one batch run strictly in the given order, because
//! downstream resources may depend on upstream ones reaching readiness
//! first. Independent target groups can run in parallel worker tasks,
//! each with its own sequential ordering.

use tokio::sync::watch;
use tracing::{error, info, warn};

use converge_core::query::ResourceQuery;
use converge_core::types::{RolloutReport, WaitSpec};

use crate::waiter::Waiter;

/// What to do after a target fails to reach satisfaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop launching further waits on the first non-satisfied
    /// outcome; the report stays partial.
    #[default]
    FailFast,
    /// Execute every target and aggregate.
    RunAll,
}

/// Sequences wait specs through the waiter engine.
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    waiter: Waiter,
    policy: FailurePolicy,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_waiter(mut self, waiter: Waiter) -> Self {
        self.waiter = waiter;
        self
    }

    /// Run an ordered batch of waits.
    ///
    /// Waiter outcomes are collected as-is, never reinterpreted. The
    /// report always contains every executed outcome, even when the
    /// policy halts the batch early.
    pub async fn run<Q: ResourceQuery>(
        &self,
        targets: Vec<WaitSpec>,
        query: &Q,
        cancel: watch::Receiver<bool>,
    ) -> RolloutReport {
        let total = targets.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, spec) in targets.into_iter().enumerate() {
            info!(
                waiting_for = %spec.target,
                predicate = %spec.predicate,
                step = index + 1,
                total,
                "starting wait"
            );
            let outcome = self.waiter.wait(&spec, query, cancel.clone()).await;
            let satisfied = outcome.result.is_satisfied();
            if !satisfied {
                warn!(
                    waiting_for = %outcome.target,
                    result = %outcome.result,
                    step = index + 1,
                    total,
                    "wait did not converge"
                );
            }
            outcomes.push(outcome);

            if !satisfied && self.policy == FailurePolicy::FailFast {
                warn!(
                    completed = outcomes.len(),
                    total,
                    "halting rollout after failure"
                );
                break;
            }
        }

        RolloutReport { outcomes }
    }

    /// Run independent target groups in parallel worker tasks.
    ///
    /// Ordering inside each group stays sequential; groups share only
    /// the cloned query handle and the cancellation channel. Outcomes
    /// are flattened in group order.
    pub async fn run_groups<Q>(
        &self,
        groups: Vec<Vec<WaitSpec>>,
        query: &Q,
        cancel: watch::Receiver<bool>,
    ) -> RolloutReport
    where
        Q: ResourceQuery + Clone + 'static,
    {
        let mut handles = Vec::with_capacity(groups.len());
        for group in groups {
            let orchestrator = self.clone();
            let query = query.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                orchestrator.run(group, &query, cancel).await
            }));
        }

        let mut outcomes = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(report) => outcomes.extend(report.outcomes),
                Err(e) => error!(error = %e, "wait group task failed"),
            }
        }

        RolloutReport { outcomes }
    }
}
