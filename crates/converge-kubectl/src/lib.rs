//! converge-kubectl — `ResourceQuery` backed by the kubectl CLI.
//!
//! Issues one `kubectl get <kind> [name] -o json` per query and maps
//! the structured output to resource snapshots. NotFound is absence
//! (an empty result), never an error; every other failure surfaces as
//! an `AdapterError` for the waiter to retry.

pub mod parse;

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, trace};

use converge_core::error::AdapterError;
use converge_core::query::ResourceQuery;
use converge_core::types::{ResourceKind, ResourceSnapshot};

/// A kubectl-backed query binding.
#[derive(Debug, Clone)]
pub struct KubectlQuery {
    program: PathBuf,
    kubeconfig: Option<PathBuf>,
}

impl Default for KubectlQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl KubectlQuery {
    /// Use `kubectl` from PATH with the ambient kubeconfig.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("kubectl"),
            kubeconfig: None,
        }
    }

    /// Use a specific client binary (e.g. an absolute path or `oc`).
    pub fn with_program(mut self, program: PathBuf) -> Self {
        self.program = program;
        self
    }

    /// Use an explicit kubeconfig file.
    pub fn with_kubeconfig(mut self, kubeconfig: PathBuf) -> Self {
        self.kubeconfig = Some(kubeconfig);
        self
    }

    async fn run_get(
        &self,
        scope: &str,
        kind: ResourceKind,
        name_filter: Option<&str>,
    ) -> Result<Option<serde_json::Value>, AdapterError> {
        let args = build_args(scope, kind, name_filter, self.kubeconfig.as_deref());
        debug!(program = %self.program.display(), ?args, "querying cluster state");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| AdapterError::Transport(format!("failed to run kubectl: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_not_found(&stderr) {
                trace!(kind = %kind, scope, "resource not found");
                return Ok(None);
            }
            return Err(AdapterError::Command(format!(
                "kubectl get {kind} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        // `--ignore-not-found` yields empty output for a missing
        // named resource.
        if stdout.trim().is_empty() {
            return Ok(None);
        }

        let value: serde_json::Value = serde_json::from_str(&stdout)
            .map_err(|e| AdapterError::Malformed(format!("invalid JSON from kubectl: {e}")))?;
        Ok(Some(value))
    }
}

impl ResourceQuery for KubectlQuery {
    async fn query(
        &self,
        scope: &str,
        kind: ResourceKind,
        name_filter: Option<&str>,
    ) -> Result<Vec<ResourceSnapshot>, AdapterError> {
        match self.run_get(scope, kind, name_filter).await? {
            None => Ok(Vec::new()),
            Some(value) => parse::snapshots_from_json(&value, scope, kind),
        }
    }
}

/// Argument list for one `kubectl get` invocation.
fn build_args(
    scope: &str,
    kind: ResourceKind,
    name_filter: Option<&str>,
    kubeconfig: Option<&std::path::Path>,
) -> Vec<String> {
    let mut args = vec!["get".to_string(), kind.as_str().to_string()];
    if let Some(name) = name_filter {
        args.push(name.to_string());
    }
    if !kind.is_cluster_scoped() {
        args.push("--namespace".to_string());
        args.push(scope.to_string());
    }
    args.push("--output".to_string());
    args.push("json".to_string());
    args.push("--ignore-not-found".to_string());
    if let Some(path) = kubeconfig {
        args.push("--kubeconfig".to_string());
        args.push(path.display().to_string());
    }
    args
}

/// Whether a failed invocation's stderr reports a missing resource
/// rather than a broken query path.
fn is_not_found(stderr: &str) -> bool {
    stderr.contains("NotFound") || stderr.contains("not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaced_query_args() {
        let args = build_args("scf", ResourceKind::StatefulSet, None, None);
        assert_eq!(
            args,
            vec![
                "get",
                "statefulset",
                "--namespace",
                "scf",
                "--output",
                "json",
                "--ignore-not-found",
            ]
        );
    }

    #[test]
    fn named_query_includes_name_before_flags() {
        let args = build_args("scf", ResourceKind::Deployment, Some("api"), None);
        assert_eq!(args[..3], ["get", "deployment", "api"]);
    }

    #[test]
    fn cluster_scoped_kind_omits_namespace_flag() {
        let args = build_args("uaa", ResourceKind::Namespace, Some("uaa"), None);
        assert!(!args.contains(&"--namespace".to_string()));
        assert_eq!(args[..3], ["get", "namespace", "uaa"]);
    }

    #[test]
    fn kubeconfig_flag_is_appended() {
        let args = build_args(
            "scf",
            ResourceKind::Pod,
            None,
            Some(std::path::Path::new("/etc/converge/kubeconfig")),
        );
        assert_eq!(
            args[args.len() - 2..],
            ["--kubeconfig", "/etc/converge/kubeconfig"]
        );
    }

    #[test]
    fn not_found_stderr_is_absence() {
        assert!(is_not_found(
            "Error from server (NotFound): namespaces \"uaa\" not found"
        ));
        assert!(!is_not_found("Unable to connect to the server: EOF"));
    }

    #[tokio::test]
    async fn missing_binary_is_transport_error() {
        let query = KubectlQuery::new()
            .with_program(PathBuf::from("/nonexistent/kubectl-for-converge-tests"));
        let err = query
            .query("scf", ResourceKind::Deployment, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Transport(_)));
    }
}
