//! Domain types for convergence waits.
//!
//! These types describe the identity of cluster resources, point-in-time
//! observations of their status, the wait requests issued against them,
//! and the terminal outcomes those waits produce. All types serialize
//! to/from JSON for report output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

// ── Resource identity ──────────────────────────────────────────────

/// Kind of a namespaced (or cluster-scoped, for `Namespace`) resource
/// collection.
///
/// Serializes as the lowercase resource name used on the query
/// surface (`daemonset`, `deployment`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    DaemonSet,
    Deployment,
    ReplicaSet,
    StatefulSet,
    Pod,
    Namespace,
}

impl ResourceKind {
    /// The lowercase resource name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::DaemonSet => "daemonset",
            ResourceKind::Deployment => "deployment",
            ResourceKind::ReplicaSet => "replicaset",
            ResourceKind::StatefulSet => "statefulset",
            ResourceKind::Pod => "pod",
            ResourceKind::Namespace => "namespace",
        }
    }

    /// Whether this kind lives outside any namespace.
    pub fn is_cluster_scoped(&self) -> bool {
        matches!(self, ResourceKind::Namespace)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daemonset" | "daemonsets" | "ds" => Ok(ResourceKind::DaemonSet),
            "deployment" | "deployments" | "deploy" => Ok(ResourceKind::Deployment),
            "replicaset" | "replicasets" | "rs" => Ok(ResourceKind::ReplicaSet),
            "statefulset" | "statefulsets" | "sts" => Ok(ResourceKind::StatefulSet),
            "pod" | "pods" | "po" => Ok(ResourceKind::Pod),
            "namespace" | "namespaces" | "ns" => Ok(ResourceKind::Namespace),
            other => Err(ConfigError::UnknownKind(other.to_string())),
        }
    }
}

/// Immutable identity of a single resource: kind + name within a scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub name: String,
    /// Namespace the resource lives in. For cluster-scoped kinds this
    /// is informational only.
    pub scope: String,
}

impl ResourceRef {
    pub fn new(scope: &str, kind: ResourceKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            scope: scope.to_string(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.scope, self.kind, self.name)
    }
}

// ── Observation ────────────────────────────────────────────────────

/// A point-in-time observation of one resource's status.
///
/// Produced fresh on every poll cycle; never mutated, only replaced.
/// A `desired` of `None` means the desired count could not be
/// determined from the status payload — such a snapshot never counts
/// as ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub resource: ResourceRef,
    pub desired: Option<u32>,
    pub ready: Option<u32>,
    pub exists: bool,
}

impl ResourceSnapshot {
    /// An observation of an existing resource with the given counts.
    pub fn observed(resource: ResourceRef, desired: Option<u32>, ready: Option<u32>) -> Self {
        Self {
            resource,
            desired,
            ready,
            exists: true,
        }
    }

    /// An observation that the resource does not exist.
    pub fn absent(resource: ResourceRef) -> Self {
        Self {
            resource,
            desired: None,
            ready: None,
            exists: false,
        }
    }
}

// ── Wait requests ──────────────────────────────────────────────────

/// Target condition a wait drives toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Predicate {
    /// Every observed resource reports `ready == desired`, with the
    /// desired count known.
    #[serde(rename = "ready")]
    ReadyCountMatchesDesired,
    /// No matching resource exists.
    Absent,
}

impl FromStr for Predicate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ready" => Ok(Predicate::ReadyCountMatchesDesired),
            "absent" | "deleted" => Ok(Predicate::Absent),
            other => Err(ConfigError::UnknownPredicate(other.to_string())),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::ReadyCountMatchesDesired => f.write_str("ready"),
            Predicate::Absent => f.write_str("absent"),
        }
    }
}

/// What a wait observes: one named resource, or every resource of the
/// given kinds within a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaitTarget {
    Named(ResourceRef),
    Kinds {
        scope: String,
        kinds: Vec<ResourceKind>,
    },
}

impl WaitTarget {
    pub fn scope(&self) -> &str {
        match self {
            WaitTarget::Named(r) => &r.scope,
            WaitTarget::Kinds { scope, .. } => scope,
        }
    }
}

impl fmt::Display for WaitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitTarget::Named(r) => write!(f, "{r}"),
            WaitTarget::Kinds { scope, kinds } => {
                let kinds = kinds
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "{scope}/[{kinds}]")
            }
        }
    }
}

/// A single wait request. Immutable for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitSpec {
    pub target: WaitTarget,
    pub predicate: Predicate,
    /// Wall-clock budget measured from wait start. Zero means "check
    /// exactly once".
    pub timeout: Duration,
    /// Delay between poll cycles. Must be non-zero.
    pub poll_interval: Duration,
}

impl WaitSpec {
    /// Reject malformed specs before any query is issued.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if let WaitTarget::Kinds { kinds, .. } = &self.target {
            if kinds.is_empty() {
                return Err(ConfigError::EmptyKinds);
            }
        }
        Ok(())
    }
}

// ── Outcomes ───────────────────────────────────────────────────────

/// Why a wait ended without the predicate being satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Cancelled by an external signal.
    Cancelled,
    /// The query path failed for an unbroken streak of cycles.
    Query {
        message: String,
        consecutive_failures: u32,
    },
    /// The wait spec was rejected before any query was issued.
    InvalidSpec { message: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Cancelled => f.write_str("cancelled"),
            FailureReason::Query {
                message,
                consecutive_failures,
            } => write!(f, "query failed {consecutive_failures} times: {message}"),
            FailureReason::InvalidSpec { message } => write!(f, "invalid spec: {message}"),
        }
    }
}

/// Terminal classification of a wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WaitResult {
    Satisfied,
    TimedOut,
    Failed { reason: FailureReason },
}

impl WaitResult {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, WaitResult::Satisfied)
    }
}

impl fmt::Display for WaitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitResult::Satisfied => f.write_str("satisfied"),
            WaitResult::TimedOut => f.write_str("timed out"),
            WaitResult::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// The terminal outcome of executing one `WaitSpec`. Produced once,
/// never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOutcome {
    pub target: WaitTarget,
    pub result: WaitResult,
    pub elapsed: Duration,
    /// The most recent successfully observed snapshots, kept for
    /// diagnostics. Empty if no query ever succeeded.
    pub last_snapshots: Vec<ResourceSnapshot>,
}

// ── Rollout report ─────────────────────────────────────────────────

/// Aggregate classification of a rollout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateStatus {
    Satisfied,
    TimedOut,
    Failed,
}

/// Ordered outcomes of a batch of waits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutReport {
    pub outcomes: Vec<WaitOutcome>,
}

impl RolloutReport {
    /// Aggregate status: `Satisfied` iff every member is satisfied;
    /// otherwise the first non-satisfied member's classification.
    /// A pure function of the member outcomes.
    pub fn aggregate(&self) -> AggregateStatus {
        for outcome in &self.outcomes {
            match outcome.result {
                WaitResult::Satisfied => {}
                WaitResult::TimedOut => return AggregateStatus::TimedOut,
                WaitResult::Failed { .. } => return AggregateStatus::Failed,
            }
        }
        AggregateStatus::Satisfied
    }

    /// Outcomes that did not reach satisfaction, for failure reporting.
    pub fn unsatisfied(&self) -> impl Iterator<Item = &WaitOutcome> {
        self.outcomes.iter().filter(|o| !o.result.is_satisfied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(result: WaitResult) -> WaitOutcome {
        WaitOutcome {
            target: WaitTarget::Named(ResourceRef::new("uaa", ResourceKind::StatefulSet, "uaa")),
            result,
            elapsed: Duration::from_secs(1),
            last_snapshots: Vec::new(),
        }
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            ResourceKind::DaemonSet,
            ResourceKind::Deployment,
            ResourceKind::ReplicaSet,
            ResourceKind::StatefulSet,
            ResourceKind::Pod,
            ResourceKind::Namespace,
        ] {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn kind_accepts_short_names() {
        assert_eq!("sts".parse::<ResourceKind>().unwrap(), ResourceKind::StatefulSet);
        assert_eq!("ds".parse::<ResourceKind>().unwrap(), ResourceKind::DaemonSet);
        assert_eq!("Deployments".parse::<ResourceKind>().unwrap(), ResourceKind::Deployment);
    }

    #[test]
    fn unknown_kind_is_config_error() {
        assert!("cronjob".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn kind_serializes_lowercase() {
        let json = serde_json::to_string(&ResourceKind::StatefulSet).unwrap();
        assert_eq!(json, "\"statefulset\"");
    }

    #[test]
    fn predicate_parses_aliases() {
        assert_eq!(
            "ready".parse::<Predicate>().unwrap(),
            Predicate::ReadyCountMatchesDesired
        );
        assert_eq!("deleted".parse::<Predicate>().unwrap(), Predicate::Absent);
        assert!("converged".parse::<Predicate>().is_err());
    }

    #[test]
    fn spec_validate_rejects_zero_interval() {
        let spec = WaitSpec {
            target: WaitTarget::Named(ResourceRef::new("scf", ResourceKind::Deployment, "api")),
            predicate: Predicate::ReadyCountMatchesDesired,
            timeout: Duration::from_secs(10),
            poll_interval: Duration::ZERO,
        };
        assert!(matches!(spec.validate(), Err(ConfigError::ZeroPollInterval)));
    }

    #[test]
    fn spec_validate_rejects_empty_kinds() {
        let spec = WaitSpec {
            target: WaitTarget::Kinds {
                scope: "scf".to_string(),
                kinds: Vec::new(),
            },
            predicate: Predicate::ReadyCountMatchesDesired,
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
        };
        assert!(matches!(spec.validate(), Err(ConfigError::EmptyKinds)));
    }

    #[test]
    fn spec_validate_accepts_zero_timeout() {
        let spec = WaitSpec {
            target: WaitTarget::Named(ResourceRef::new("scf", ResourceKind::Deployment, "api")),
            predicate: Predicate::ReadyCountMatchesDesired,
            timeout: Duration::ZERO,
            poll_interval: Duration::from_secs(1),
        };
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn aggregate_satisfied_when_all_satisfied() {
        let report = RolloutReport {
            outcomes: vec![outcome(WaitResult::Satisfied), outcome(WaitResult::Satisfied)],
        };
        assert_eq!(report.aggregate(), AggregateStatus::Satisfied);
    }

    #[test]
    fn aggregate_takes_first_non_satisfied_classification() {
        let report = RolloutReport {
            outcomes: vec![
                outcome(WaitResult::Satisfied),
                outcome(WaitResult::TimedOut),
                outcome(WaitResult::Failed {
                    reason: FailureReason::Cancelled,
                }),
            ],
        };
        assert_eq!(report.aggregate(), AggregateStatus::TimedOut);
    }

    #[test]
    fn aggregate_of_empty_report_is_satisfied() {
        let report = RolloutReport { outcomes: Vec::new() };
        assert_eq!(report.aggregate(), AggregateStatus::Satisfied);
    }

    #[test]
    fn unsatisfied_lists_failures_only() {
        let report = RolloutReport {
            outcomes: vec![
                outcome(WaitResult::Satisfied),
                outcome(WaitResult::TimedOut),
            ],
        };
        let unsatisfied: Vec<_> = report.unsatisfied().collect();
        assert_eq!(unsatisfied.len(), 1);
        assert_eq!(unsatisfied[0].result, WaitResult::TimedOut);
    }

    #[test]
    fn target_display_is_readable() {
        let named = WaitTarget::Named(ResourceRef::new("uaa", ResourceKind::StatefulSet, "mysql"));
        assert_eq!(named.to_string(), "uaa/statefulset/mysql");

        let kinds = WaitTarget::Kinds {
            scope: "scf".to_string(),
            kinds: vec![ResourceKind::Deployment, ResourceKind::StatefulSet],
        };
        assert_eq!(kinds.to_string(), "scf/[deployment,statefulset]");
    }

    #[test]
    fn report_serializes_to_json() {
        let report = RolloutReport {
            outcomes: vec![outcome(WaitResult::Failed {
                reason: FailureReason::Query {
                    message: "connection refused".to_string(),
                    consecutive_failures: 5,
                },
            })],
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"status\":\"failed\""));
        assert!(json.contains("connection refused"));
    }
}
