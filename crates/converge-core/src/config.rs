//! converge.toml rollout plan parser.
//!
//! A plan is an ordered list of wait targets with optional per-target
//! overrides. File order is rollout order: downstream targets may
//! depend on upstream ones reaching readiness first.
//!
//! ```toml
//! [settings]
//! poll_interval = "5s"
//! timeout = "300s"
//! fail_fast = true
//!
//! [[target]]
//! scope = "uaa"
//! kinds = ["statefulset", "deployment"]
//!
//! [[target]]
//! scope = "scf"
//! kinds = ["statefulset", "deployment", "daemonset"]
//! timeout = "600s"
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::{Predicate, ResourceKind, ResourceRef, WaitSpec, WaitTarget};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

// ── Raw file shape ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PlanFile {
    settings: Option<SettingsSection>,
    #[serde(default, rename = "target")]
    targets: Vec<TargetSection>,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    poll_interval: Option<String>,
    timeout: Option<String>,
    fail_fast: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TargetSection {
    scope: String,
    /// Kind group form: wait on every resource of these kinds.
    kinds: Option<Vec<String>>,
    /// Named form: wait on a single resource.
    kind: Option<String>,
    name: Option<String>,
    predicate: Option<String>,
    timeout: Option<String>,
    poll_interval: Option<String>,
}

// ── Public plan ────────────────────────────────────────────────────

/// A parsed, validated rollout plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutPlan {
    /// Wait specs in rollout order.
    pub targets: Vec<WaitSpec>,
    /// Halt on the first non-satisfied outcome.
    pub fail_fast: bool,
}

impl RolloutPlan {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: PlanFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if file.targets.is_empty() {
            return Err(ConfigError::EmptyPlan);
        }

        let settings = file.settings.unwrap_or_default();
        let default_interval = match settings.poll_interval {
            Some(s) => parse_duration(&s)?,
            None => DEFAULT_POLL_INTERVAL,
        };
        let default_timeout = match settings.timeout {
            Some(s) => parse_duration(&s)?,
            None => DEFAULT_TIMEOUT,
        };

        let mut targets = Vec::with_capacity(file.targets.len());
        for section in file.targets {
            let spec = section.into_spec(default_interval, default_timeout)?;
            spec.validate()?;
            targets.push(spec);
        }

        Ok(Self {
            targets,
            fail_fast: settings.fail_fast.unwrap_or(true),
        })
    }
}

impl TargetSection {
    fn into_spec(
        self,
        default_interval: Duration,
        default_timeout: Duration,
    ) -> Result<WaitSpec, ConfigError> {
        let target = match (&self.name, &self.kind, &self.kinds) {
            (Some(name), Some(kind), None) => WaitTarget::Named(ResourceRef::new(
                &self.scope,
                kind.parse::<ResourceKind>()?,
                name,
            )),
            (None, None, Some(kinds)) => WaitTarget::Kinds {
                scope: self.scope.clone(),
                kinds: kinds
                    .iter()
                    .map(|k| k.parse::<ResourceKind>())
                    .collect::<Result<Vec<_>, _>>()?,
            },
            _ => return Err(ConfigError::AmbiguousTarget(self.scope.clone())),
        };

        let predicate = match &self.predicate {
            Some(p) => p.parse::<Predicate>()?,
            None => Predicate::ReadyCountMatchesDesired,
        };
        let timeout = match &self.timeout {
            Some(s) => parse_duration(s)?,
            None => default_timeout,
        };
        let poll_interval = match &self.poll_interval {
            Some(s) => parse_duration(s)?,
            None => default_interval,
        };

        Ok(WaitSpec {
            target,
            predicate,
            timeout,
            poll_interval,
        })
    }
}

/// Parse a duration string like "500ms", "5s", "2m", or a plain number
/// of seconds.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let trimmed = s.trim();
    let invalid = || ConfigError::InvalidDuration(s.to_string());

    if let Some(ms) = trimmed.strip_suffix("ms") {
        return ms.parse::<u64>().map(Duration::from_millis).map_err(|_| invalid());
    }
    if let Some(secs) = trimmed.strip_suffix('s') {
        return secs.parse::<u64>().map(Duration::from_secs).map_err(|_| invalid());
    }
    if let Some(mins) = trimmed.strip_suffix('m') {
        return mins
            .parse::<u64>()
            .map(|m| Duration::from_secs(m * 60))
            .map_err(|_| invalid());
    }
    trimmed.parse::<u64>().map(Duration::from_secs).map_err(|_| invalid())
}
