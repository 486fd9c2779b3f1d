// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Node-ready gate: blocks until the API server answers and the node's
//! Kubelet reports Ready.

use crate::error::Result;
use k8s_openapi::api::core::v1::Node;
use kube::{api::ListParams, Api, Client, ResourceExt};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument};

/// Check the node's Ready condition.
pub fn is_node_ready(node: &Node) -> bool {
    node.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
}

/// Poll until the single node reports Ready. Connection errors mean the API
/// server is not up yet and are retried indefinitely at a fixed interval;
/// the surrounding CI job timeout is the only bound here.
#[instrument(skip(client))]
pub async fn wait_for_node_ready(client: &Client, interval: Duration) -> Result<()> {
    let nodes: Api<Node> = Api::all(client.clone());

    loop {
        match nodes.list(&ListParams::default()).await {
            Ok(list) => {
                if let Some(node) = list.items.iter().find(|n| is_node_ready(n)) {
                    info!("Node {} is Ready", node.name_any());
                    return Ok(());
                }
                info!("Node not Ready yet, waiting {:?}...", interval);
            }
            Err(e) => {
                info!("API server not reachable yet ({}), waiting {:?}...", e, interval);
            }
        }

        sleep(interval).await;
    }
}
