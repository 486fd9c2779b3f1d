// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster-operator gate.

use crate::error::{CrcupError, Result};
use crate::readiness::GateConfig;
use kube::{api::ListParams, Api, Client, CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "config.openshift.io", version = "v1", kind = "ClusterOperator")]
#[kube(status = "ClusterOperatorStatus")]
pub struct ClusterOperatorSpec {}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOperatorStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ClusterOperator {
    fn condition_status(&self, condition_type: &str) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .and_then(|conditions| {
                conditions
                    .iter()
                    .find(|c| c.condition_type == condition_type)
                    .map(|c| c.status.as_str())
            })
    }

    /// An operator is settled when it is Available and not Progressing, at
    /// the same time.
    pub fn is_settled(&self) -> bool {
        self.condition_status("Available") == Some("True")
            && self.condition_status("Progressing") == Some("False")
    }
}

/// Poll until every cluster operator is settled. A single pending operator
/// keeps the gate closed.
#[instrument(skip(client, gate))]
pub async fn wait_for_operators_ready(client: &Client, gate: GateConfig) -> Result<()> {
    let operators: Api<ClusterOperator> = Api::all(client.clone());
    let deadline = Instant::now() + gate.timeout;

    loop {
        match operators.list(&ListParams::default()).await {
            Ok(list) => {
                let pending: Vec<String> = list
                    .items
                    .iter()
                    .filter(|op| !op.is_settled())
                    .map(|op| op.name_any())
                    .collect();

                if pending.is_empty() {
                    info!("All {} cluster operators are settled", list.items.len());
                    return Ok(());
                }

                debug!("{} operators still settling", pending.len());

                if Instant::now() >= deadline {
                    return Err(CrcupError::Timeout(format!(
                        "cluster operators not settled after {:?}: {}",
                        gate.timeout,
                        pending.join(", ")
                    )));
                }
            }
            Err(e) => {
                warn!("Operator listing failed ({}), retrying...", e);
                if Instant::now() >= deadline {
                    return Err(CrcupError::Timeout(format!(
                        "cluster operators not settled after {:?}: listing kept failing: {}",
                        gate.timeout, e
                    )));
                }
            }
        }

        sleep(gate.interval).await;
    }
}
