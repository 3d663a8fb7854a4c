//! converge — wait for cluster resources to reach a target state.
//!
//! ```text
//! converge rollout --namespace scf --kinds statefulset,deployment --timeout 600s
//! converge deleted --namespace uaa --kind namespace --name uaa
//! converge plan ./converge.toml --keep-going
//! ```
//!
//! Exit status communicates the aggregate outcome:
//! 0 = satisfied, 1 = failed (query error or cancelled), 2 = timed out.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::warn;

use converge_core::types::{
    AggregateStatus, Predicate, ResourceKind, ResourceRef, RolloutReport, WaitSpec, WaitTarget,
};
use converge_core::{RolloutPlan, parse_duration};
use converge_engine::{FailurePolicy, Orchestrator};
use converge_kubectl::KubectlQuery;

#[derive(Parser)]
#[command(
    name = "converge",
    about = "Converge — wait for cluster resources to reach a target state",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Cluster client binary to query with.
    #[arg(long, global = true, default_value = "kubectl")]
    kubectl: PathBuf,

    /// Kubeconfig file (defaults to the ambient configuration).
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Print the full rollout report as JSON to stdout.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait until workloads in a namespace report ready == desired.
    Rollout {
        /// Namespace to watch.
        #[arg(short, long)]
        namespace: String,

        /// Comma-separated resource kinds to wait on.
        #[arg(long, value_delimiter = ',', default_value = "statefulset,deployment,daemonset")]
        kinds: Vec<String>,

        /// Wait on a single named resource instead of whole kinds
        /// (requires exactly one --kinds entry).
        #[arg(long)]
        name: Option<String>,

        /// Wall-clock budget, e.g. "300s" or "10m".
        #[arg(long, default_value = "300s")]
        timeout: String,

        /// Delay between poll cycles, e.g. "5s".
        #[arg(long, default_value = "5s")]
        interval: String,
    },
    /// Wait until a resource is gone.
    Deleted {
        /// Namespace the resource lives in (for cluster-scoped kinds,
        /// informational only).
        #[arg(short, long)]
        namespace: String,

        /// Resource kind.
        #[arg(long)]
        kind: String,

        /// Resource name; without it, waits until no resource of the
        /// kind remains in the namespace.
        #[arg(long)]
        name: Option<String>,

        #[arg(long, default_value = "120s")]
        timeout: String,

        #[arg(long, default_value = "5s")]
        interval: String,
    },
    /// Run an ordered rollout plan from a converge.toml file.
    Plan {
        /// Plan file path.
        plan: PathBuf,

        /// Run every target even after a failure (default halts on
        /// the first).
        #[arg(long)]
        keep_going: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,converge=debug".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut query = KubectlQuery::new().with_program(cli.kubectl.clone());
    if let Some(kubeconfig) = &cli.kubeconfig {
        query = query.with_kubeconfig(kubeconfig.clone());
    }

    // Ctrl-C forwards as cooperative cancellation; in-flight waits
    // observe it within one poll interval.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling waits");
            let _ = cancel_tx.send(true);
        }
    });

    let (targets, policy) = match &cli.command {
        Commands::Rollout {
            namespace,
            kinds,
            name,
            timeout,
            interval,
        } => {
            let spec = build_spec(
                namespace,
                kinds,
                name.as_deref(),
                Predicate::ReadyCountMatchesDesired,
                timeout,
                interval,
            )?;
            (vec![spec], FailurePolicy::FailFast)
        }
        Commands::Deleted {
            namespace,
            kind,
            name,
            timeout,
            interval,
        } => {
            let spec = build_spec(
                namespace,
                std::slice::from_ref(kind),
                name.as_deref(),
                Predicate::Absent,
                timeout,
                interval,
            )?;
            (vec![spec], FailurePolicy::FailFast)
        }
        Commands::Plan { plan, keep_going } => {
            let plan = RolloutPlan::from_file(plan)?;
            let policy = if *keep_going || !plan.fail_fast {
                FailurePolicy::RunAll
            } else {
                FailurePolicy::FailFast
            };
            (plan.targets, policy)
        }
    };

    let report = Orchestrator::new()
        .with_policy(policy)
        .run(targets, &query, cancel_rx)
        .await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    std::process::exit(match report.aggregate() {
        AggregateStatus::Satisfied => 0,
        AggregateStatus::Failed => 1,
        AggregateStatus::TimedOut => 2,
    });
}

/// Assemble a single wait spec from CLI arguments.
fn build_spec(
    namespace: &str,
    kinds: &[String],
    name: Option<&str>,
    predicate: Predicate,
    timeout: &str,
    interval: &str,
) -> anyhow::Result<WaitSpec> {
    let kinds = kinds
        .iter()
        .map(|k| k.parse::<ResourceKind>())
        .collect::<Result<Vec<_>, _>>()?;

    let target = match name {
        Some(name) => {
            let &[kind] = &kinds[..] else {
                anyhow::bail!("--name requires exactly one kind, got {}", kinds.len());
            };
            WaitTarget::Named(ResourceRef::new(namespace, kind, name))
        }
        None => WaitTarget::Kinds {
            scope: namespace.to_string(),
            kinds,
        },
    };

    let spec = WaitSpec {
        target,
        predicate,
        timeout: parse_duration(timeout)?,
        poll_interval: parse_duration(interval)?,
    };
    spec.validate()?;
    Ok(spec)
}

fn print_summary(report: &RolloutReport) {
    for outcome in &report.outcomes {
        println!(
            "{:<10} {}  ({}s)",
            outcome.result,
            outcome.target,
            outcome.elapsed.as_secs()
        );
        if !outcome.result.is_satisfied() {
            for snapshot in &outcome.last_snapshots {
                let desired = snapshot
                    .desired
                    .map_or_else(|| "?".to_string(), |d| d.to_string());
                let ready = snapshot
                    .ready
                    .map_or_else(|| "?".to_string(), |r| r.to_string());
                println!(
                    "  last seen: {} ready={ready} desired={desired} exists={}",
                    snapshot.resource, snapshot.exists
                );
            }
        }
    }
    println!("aggregate: {:?}", report.aggregate());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::time::Duration;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn rollout_args_build_a_kind_group_spec() {
        let spec = build_spec(
            "scf",
            &["statefulset".to_string(), "deployment".to_string()],
            None,
            Predicate::ReadyCountMatchesDesired,
            "600s",
            "5s",
        )
        .unwrap();
        assert_eq!(spec.timeout, Duration::from_secs(600));
        match spec.target {
            WaitTarget::Kinds { scope, kinds } => {
                assert_eq!(scope, "scf");
                assert_eq!(kinds.len(), 2);
            }
            other => panic!("unexpected target: {other:?}"),
        }
    }

    #[test]
    fn named_spec_requires_single_kind() {
        let err = build_spec(
            "scf",
            &["statefulset".to_string(), "deployment".to_string()],
            Some("mysql"),
            Predicate::ReadyCountMatchesDesired,
            "60s",
            "5s",
        )
        .unwrap_err();
        assert!(err.to_string().contains("exactly one kind"));
    }

    #[test]
    fn deleted_args_build_an_absent_spec() {
        let spec = build_spec(
            "uaa",
            &["namespace".to_string()],
            Some("uaa"),
            Predicate::Absent,
            "120s",
            "5s",
        )
        .unwrap();
        assert_eq!(spec.predicate, Predicate::Absent);
        match spec.target {
            WaitTarget::Named(r) => assert_eq!(r.kind, ResourceKind::Namespace),
            other => panic!("unexpected target: {other:?}"),
        }
    }
}
