// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Essential-pod gate.
//!
//! On a resource-starved single-node cluster some workloads are permanently
//! scaled down or churn without affecting usability. A naive "all pods
//! Running" check never converges, so which pods count is a first-class
//! concept: a pod blocks readiness only if it is neither Running nor
//! Completed and matches no ignore rule.

use crate::error::{CrcupError, Result};
use crate::readiness::GateConfig;
use k8s_openapi::api::core::v1::Pod;
use kube::{api::ListParams, Api, Client, ResourceExt};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

enum NameMatcher {
    /// Any pod in the namespace
    Any,
    /// Name starts with the prefix
    Prefix(&'static str),
    /// Cron-spawned child: prefix followed by a numeric run id, e.g.
    /// "collect-profiles-20240101-abcde"
    CronChild(&'static str),
}

struct IgnoreRule {
    namespace: Option<&'static str>,
    name: NameMatcher,
}

/// Workloads whose pods never block readiness. Additions here should name
/// the component, not a symptom.
const IGNORE_RULES: &[IgnoreRule] = &[
    // Profile collection cron jobs come and go by design
    IgnoreRule {
        namespace: None,
        name: NameMatcher::CronChild("collect-profiles-"),
    },
    // Connectivity checkers flap while the network settles
    IgnoreRule {
        namespace: Some("openshift-network-diagnostics"),
        name: NameMatcher::Any,
    },
    // Console is scaled down by the trimmer
    IgnoreRule {
        namespace: Some("openshift-console"),
        name: NameMatcher::Any,
    },
    // Storage version migrator runs at zero replicas on CRC
    IgnoreRule {
        namespace: Some("openshift-kube-storage-version-migrator"),
        name: NameMatcher::Prefix("migrator"),
    },
    // Marketplace catalog sources are intentionally absent
    IgnoreRule {
        namespace: Some("openshift-marketplace"),
        name: NameMatcher::Prefix("marketplace-operator"),
    },
    IgnoreRule {
        namespace: Some("openshift-marketplace"),
        name: NameMatcher::Prefix("community-operators"),
    },
    IgnoreRule {
        namespace: Some("openshift-marketplace"),
        name: NameMatcher::Prefix("certified-operators"),
    },
    IgnoreRule {
        namespace: Some("openshift-marketplace"),
        name: NameMatcher::Prefix("redhat-operators"),
    },
    IgnoreRule {
        namespace: Some("openshift-marketplace"),
        name: NameMatcher::Prefix("redhat-marketplace"),
    },
];

impl NameMatcher {
    fn matches(&self, name: &str) -> bool {
        match self {
            NameMatcher::Any => true,
            NameMatcher::Prefix(prefix) => name.starts_with(prefix),
            NameMatcher::CronChild(prefix) => {
                let Some(rest) = name.strip_prefix(prefix) else {
                    return false;
                };
                let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
                digits > 0 && rest[digits..].starts_with('-')
            }
        }
    }
}

impl IgnoreRule {
    fn matches(&self, namespace: &str, name: &str) -> bool {
        self.namespace.is_none_or(|ns| ns == namespace) && self.name.matches(name)
    }
}

pub fn is_ignored(namespace: &str, name: &str) -> bool {
    IGNORE_RULES
        .iter()
        .any(|rule| rule.matches(namespace, name))
}

/// Whether this pod keeps the gate closed.
pub fn is_blocking(pod: &Pod) -> bool {
    let phase = pod
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .unwrap_or("Unknown");

    // "Completed" in CLI output is phase Succeeded
    if matches!(phase, "Running" | "Succeeded") {
        return false;
    }

    !is_ignored(&pod.namespace().unwrap_or_default(), &pod.name_any())
}

fn describe(pod: &Pod) -> String {
    format!(
        "{}/{} ({})",
        pod.namespace().unwrap_or_default(),
        pod.name_any(),
        pod.status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .unwrap_or("Unknown")
    )
}

/// Poll until every non-ignored pod is Running or Completed. On timeout the
/// remaining blockers are part of the error so the CI log is actionable.
#[instrument(skip(client, gate))]
pub async fn wait_for_pods_ready(client: &Client, gate: GateConfig) -> Result<()> {
    let pods: Api<Pod> = Api::all(client.clone());
    let deadline = Instant::now() + gate.timeout;

    loop {
        match pods.list(&ListParams::default()).await {
            Ok(list) => {
                let blockers: Vec<String> = list
                    .items
                    .iter()
                    .filter(|p| is_blocking(p))
                    .map(describe)
                    .collect();

                if blockers.is_empty() {
                    info!("All essential pods are Running or Completed");
                    return Ok(());
                }

                debug!("{} pods still blocking readiness", blockers.len());

                if Instant::now() >= deadline {
                    return Err(CrcupError::Timeout(format!(
                        "essential pods not ready after {:?}: {}",
                        gate.timeout,
                        blockers.join(", ")
                    )));
                }
            }
            Err(e) => {
                warn!("Pod listing failed ({}), retrying...", e);
                if Instant::now() >= deadline {
                    return Err(CrcupError::Timeout(format!(
                        "essential pods not ready after {:?}: pod listing kept failing: {}",
                        gate.timeout, e
                    )));
                }
            }
        }

        sleep(gate.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{pod_json, pod_list_json, MockService};
    use std::time::Duration;

    fn gate() -> GateConfig {
        GateConfig::new(Duration::from_millis(0), Duration::from_millis(0))
    }

    fn make_pod(namespace: &str, name: &str, phase: &str) -> Pod {
        serde_json::from_value(pod_json(namespace, name, phase)).unwrap()
    }

    #[test]
    fn test_running_pod_never_blocks() {
        assert!(!is_blocking(&make_pod("openshift-etcd", "etcd-0", "Running")));
    }

    #[test]
    fn test_completed_pod_never_blocks() {
        assert!(!is_blocking(&make_pod("openshift-etcd", "installer-1", "Succeeded")));
    }

    #[test]
    fn test_pending_essential_pod_blocks() {
        assert!(is_blocking(&make_pod("openshift-etcd", "etcd-0", "Pending")));
    }

    #[test]
    fn test_cron_child_is_ignored() {
        assert!(is_ignored(
            "openshift-operator-lifecycle-manager",
            "collect-profiles-20240101-abcde"
        ));
        assert!(!is_blocking(&make_pod(
            "openshift-operator-lifecycle-manager",
            "collect-profiles-20240101-abcde",
            "Pending"
        )));
    }

    #[test]
    fn test_cron_child_requires_numeric_run_id() {
        assert!(!is_ignored("default", "collect-profiles-notdigits"));
    }

    #[test]
    fn test_network_diagnostics_namespace_is_ignored() {
        assert!(is_ignored("openshift-network-diagnostics", "network-check-target-abc"));
    }

    #[test]
    fn test_console_namespace_is_ignored() {
        assert!(is_ignored("openshift-console", "console-7d9f8b-xyz"));
    }

    #[test]
    fn test_storage_migrator_is_ignored() {
        assert!(is_ignored("openshift-kube-storage-version-migrator", "migrator-abc"));
        assert!(!is_ignored("openshift-kube-storage-version-migrator", "other-pod"));
    }

    #[test]
    fn test_catalog_sources_are_ignored() {
        assert!(is_ignored("openshift-marketplace", "redhat-operators-abc"));
        assert!(is_ignored("openshift-marketplace", "community-operators-xyz"));
    }

    #[test]
    fn test_etcd_is_not_ignored() {
        assert!(!is_ignored("openshift-etcd", "etcd-0"));
    }

    #[test]
    fn test_namespaced_rule_does_not_leak() {
        // A migrator-named pod elsewhere still counts
        assert!(!is_ignored("default", "migrator-abc"));
    }

    #[tokio::test]
    async fn test_gate_passes_when_only_ignored_pods_block() {
        let body = pod_list_json(&[
            pod_json("openshift-etcd", "etcd-0", "Running"),
            pod_json("openshift-console", "console-1", "Pending"),
            pod_json("olm", "collect-profiles-20240101-abcde", "Failed"),
        ]);
        let client = MockService::new()
            .on_get("/api/v1/pods", 200, &body)
            .into_client();

        wait_for_pods_ready(&client, gate()).await.unwrap();
    }

    #[tokio::test]
    async fn test_gate_times_out_listing_blockers() {
        let body = pod_list_json(&[pod_json("openshift-etcd", "etcd-0", "Pending")]);
        let client = MockService::new()
            .on_get("/api/v1/pods", 200, &body)
            .into_client();

        let err = wait_for_pods_ready(&client, gate()).await.unwrap_err();
        match err {
            CrcupError::Timeout(msg) => assert!(msg.contains("openshift-etcd/etcd-0")),
            other => panic!("unexpected error: {}", other),
        }
    }
}
