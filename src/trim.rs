// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Post-start trimming of non-essential cluster components.
//!
//! Fire and continue: every patch tolerates "not found" as an idempotent
//! no-op and a failed patch never aborts the run. Scaling alone is not
//! enough because the owning operators reconcile replicas back up, so the
//! operator configs are also flipped to managementState Removed.

use crate::constants::MANAGER_NAME;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use kube::api::{DynamicObject, Patch, PatchParams};
use kube::core::{ApiResource, GroupVersionKind};
use kube::{Api, Client};
use serde_json::json;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy)]
enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
}

struct ScaleTarget {
    namespace: &'static str,
    kind: WorkloadKind,
    name: &'static str,
}

/// Workloads a CI cluster can live without.
const SCALE_TARGETS: &[ScaleTarget] = &[
    ScaleTarget {
        namespace: "openshift-monitoring",
        kind: WorkloadKind::Deployment,
        name: "cluster-monitoring-operator",
    },
    ScaleTarget {
        namespace: "openshift-monitoring",
        kind: WorkloadKind::Deployment,
        name: "prometheus-operator",
    },
    ScaleTarget {
        namespace: "openshift-monitoring",
        kind: WorkloadKind::StatefulSet,
        name: "prometheus-k8s",
    },
    ScaleTarget {
        namespace: "openshift-monitoring",
        kind: WorkloadKind::StatefulSet,
        name: "alertmanager-main",
    },
    ScaleTarget {
        namespace: "openshift-monitoring",
        kind: WorkloadKind::DaemonSet,
        name: "node-exporter",
    },
    ScaleTarget {
        namespace: "openshift-console",
        kind: WorkloadKind::Deployment,
        name: "console",
    },
    ScaleTarget {
        namespace: "openshift-console",
        kind: WorkloadKind::Deployment,
        name: "downloads",
    },
    ScaleTarget {
        namespace: "openshift-image-registry",
        kind: WorkloadKind::Deployment,
        name: "image-registry",
    },
    ScaleTarget {
        namespace: "openshift-insights",
        kind: WorkloadKind::Deployment,
        name: "insights-operator",
    },
    ScaleTarget {
        namespace: "openshift-marketplace",
        kind: WorkloadKind::Deployment,
        name: "marketplace-operator",
    },
];

struct OperatorFlag {
    group: &'static str,
    version: &'static str,
    kind: &'static str,
    plural: &'static str,
    name: &'static str,
}

/// Operator configs flipped to managementState Removed so the components
/// above stay down.
const MANAGEMENT_FLAGS: &[OperatorFlag] = &[
    OperatorFlag {
        group: "operator.openshift.io",
        version: "v1",
        kind: "Console",
        plural: "consoles",
        name: "cluster",
    },
    OperatorFlag {
        group: "samples.operator.openshift.io",
        version: "v1",
        kind: "Config",
        plural: "configs",
        name: "cluster",
    },
    OperatorFlag {
        group: "imageregistry.operator.openshift.io",
        version: "v1",
        kind: "Config",
        plural: "configs",
        name: "cluster",
    },
];

/// What the trimmer managed to do; surfaced in the log, never fatal.
#[derive(Debug, Default)]
pub struct TrimSummary {
    pub scaled: Vec<String>,
    pub flagged: Vec<String>,
    pub missing: Vec<String>,
    pub failed: Vec<String>,
}

impl TrimSummary {
    pub fn log(&self) {
        info!(
            "Trim summary: {} scaled down, {} operators flagged, {} absent, {} failed",
            self.scaled.len(),
            self.flagged.len(),
            self.missing.len(),
            self.failed.len()
        );
        for failure in &self.failed {
            warn!("Trim step failed: {}", failure);
        }
    }
}

enum PatchOutcome {
    Done,
    Missing,
    Failed(String),
}

/// Apply a merge patch, treating "not found" as an idempotent no-op.
async fn patch_tolerant<K>(
    api: &Api<K>,
    name: &str,
    patch: &Patch<serde_json::Value>,
) -> PatchOutcome
where
    K: Clone + serde::de::DeserializeOwned + std::fmt::Debug,
{
    match api
        .patch(name, &PatchParams::apply(MANAGER_NAME), patch)
        .await
    {
        Ok(_) => PatchOutcome::Done,
        Err(kube::Error::Api(e)) if e.code == 404 => PatchOutcome::Missing,
        Err(e) => PatchOutcome::Failed(e.to_string()),
    }
}

/// Scale down the non-essential workloads and flip operator management
/// state. Never returns an error; the summary records what happened.
#[instrument(skip(client))]
pub async fn trim_cluster(client: &Client) -> TrimSummary {
    let mut summary = TrimSummary::default();

    for target in SCALE_TARGETS {
        let label = format!("{}/{}", target.namespace, target.name);
        match scale_down(client, target).await {
            PatchOutcome::Done => {
                debug!("Scaled down {}", label);
                summary.scaled.push(label);
            }
            PatchOutcome::Missing => {
                debug!("{} not present, nothing to scale", label);
                summary.missing.push(label);
            }
            PatchOutcome::Failed(e) => summary.failed.push(format!("{}: {}", label, e)),
        }
    }

    for flag in MANAGEMENT_FLAGS {
        let label = format!("{}.{}/{}", flag.plural, flag.group, flag.name);
        match flip_management_state(client, flag).await {
            PatchOutcome::Done => {
                debug!("Set {} to managementState Removed", label);
                summary.flagged.push(label);
            }
            PatchOutcome::Missing => {
                debug!("{} not present, nothing to flag", label);
                summary.missing.push(label);
            }
            PatchOutcome::Failed(e) => summary.failed.push(format!("{}: {}", label, e)),
        }
    }

    summary.log();
    summary
}

async fn scale_down(client: &Client, target: &ScaleTarget) -> PatchOutcome {
    let zero_replicas = Patch::Merge(json!({ "spec": { "replicas": 0 } }));
    match target.kind {
        WorkloadKind::Deployment => {
            let api: Api<Deployment> = Api::namespaced(client.clone(), target.namespace);
            patch_tolerant(&api, target.name, &zero_replicas).await
        }
        WorkloadKind::StatefulSet => {
            let api: Api<StatefulSet> = Api::namespaced(client.clone(), target.namespace);
            patch_tolerant(&api, target.name, &zero_replicas).await
        }
        WorkloadKind::DaemonSet => {
            // DaemonSets have no replica count; an impossible node selector
            // drains them instead
            let api: Api<DaemonSet> = Api::namespaced(client.clone(), target.namespace);
            let patch = Patch::Merge(json!({
                "spec": { "template": { "spec": {
                    "nodeSelector": { "crcup/disabled": "true" }
                } } }
            }));
            patch_tolerant(&api, target.name, &patch).await
        }
    }
}

async fn flip_management_state(client: &Client, flag: &OperatorFlag) -> PatchOutcome {
    let gvk = GroupVersionKind::gvk(flag.group, flag.version, flag.kind);
    let resource = ApiResource::from_gvk_with_plural(&gvk, flag.plural);
    let api: Api<DynamicObject> = Api::all_with(client.clone(), &resource);

    let patch = Patch::Merge(json!({ "spec": { "managementState": "Removed" } }));
    patch_tolerant(&api, flag.name, &patch).await
}

/// Reclaim the bundle archives CRC downloaded into its (relocated) cache.
/// The running VM no longer needs them; on a 14 GB root volume they matter.
pub fn reclaim_bundles(cache_dir: &Path) -> u64 {
    let mut freed = 0;
    let Ok(entries) = std::fs::read_dir(cache_dir) else {
        debug!("No bundle cache at {}", cache_dir.display());
        return 0;
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let is_bundle = path
            .extension()
            .is_some_and(|ext| ext == "crcbundle");
        if !is_bundle {
            continue;
        }
        match std::fs::metadata(&path).map(|m| m.len()) {
            Ok(size) => {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!("Could not remove bundle {}: {}", path.display(), e);
                } else {
                    freed += size;
                }
            }
            Err(e) => warn!("Could not stat bundle {}: {}", path.display(), e),
        }
    }

    if freed > 0 {
        info!(
            "Reclaimed {} MiB of bundle cache",
            freed / (1024 * 1024)
        );
    }
    freed
}
