//! Status extraction from `kubectl get -o json` payloads.
//!
//! Maps the raw JSON of each supported kind to a `ResourceSnapshot`.
//! A missing desired count maps to `None` so an incomplete status can
//! never count as ready; a ready count omitted from a present status
//! block counts as 0, since the API elides zero counts.

use serde_json::Value;

use converge_core::error::AdapterError;
use converge_core::types::{ResourceKind, ResourceRef, ResourceSnapshot};

/// Convert a `kubectl get -o json` payload (single object or `List`)
/// into snapshots.
pub fn snapshots_from_json(
    value: &Value,
    scope: &str,
    kind: ResourceKind,
) -> Result<Vec<ResourceSnapshot>, AdapterError> {
    let is_list = value
        .get("kind")
        .and_then(Value::as_str)
        .is_some_and(|k| k.ends_with("List"));

    if is_list {
        let items = value
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| AdapterError::Malformed("List payload without items".to_string()))?;
        items
            .iter()
            .map(|item| snapshot_from_item(item, scope, kind))
            .collect()
    } else {
        Ok(vec![snapshot_from_item(value, scope, kind)?])
    }
}

fn snapshot_from_item(
    item: &Value,
    scope: &str,
    kind: ResourceKind,
) -> Result<ResourceSnapshot, AdapterError> {
    let name = item
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .ok_or_else(|| AdapterError::Malformed("object without metadata.name".to_string()))?;
    // Prefer the namespace the API reports over the queried scope.
    let namespace = item
        .pointer("/metadata/namespace")
        .and_then(Value::as_str)
        .unwrap_or(scope);
    let resource = ResourceRef::new(namespace, kind, name);

    let (desired, ready) = counts(item, kind);
    Ok(ResourceSnapshot::observed(resource, desired, ready))
}

/// Per-kind desired/ready extraction.
fn counts(item: &Value, kind: ResourceKind) -> (Option<u32>, Option<u32>) {
    match kind {
        ResourceKind::Deployment | ResourceKind::ReplicaSet | ResourceKind::StatefulSet => {
            let desired = count_at(item, "/spec/replicas");
            let ready = count_at(item, "/status/readyReplicas")
                .or_else(|| item.get("status").map(|_| 0));
            (desired, ready)
        }
        ResourceKind::DaemonSet => {
            let desired = count_at(item, "/status/desiredNumberScheduled");
            let ready =
                count_at(item, "/status/numberReady").or_else(|| item.get("status").map(|_| 0));
            (desired, ready)
        }
        ResourceKind::Pod => {
            let ready = pod_ready_condition(item);
            (Some(1), Some(u32::from(ready)))
        }
        ResourceKind::Namespace => {
            let active = item
                .pointer("/status/phase")
                .and_then(Value::as_str)
                .is_some_and(|phase| phase == "Active");
            (Some(1), Some(u32::from(active)))
        }
    }
}

fn count_at(item: &Value, pointer: &str) -> Option<u32> {
    item.pointer(pointer)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

fn pod_ready_condition(item: &Value) -> bool {
    item.pointer("/status/conditions")
        .and_then(Value::as_array)
        .is_some_and(|conditions| {
            conditions.iter().any(|c| {
                c.get("type").and_then(Value::as_str) == Some("Ready")
                    && c.get("status").and_then(Value::as_str) == Some("True")
            })
        })
}
