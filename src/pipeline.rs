// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Sequential stage orchestration:
//! Resolver -> Download -> Bring-up -> Poller -> Trimmer.
//!
//! No stage begins before its predecessor succeeded; a fatal stage error
//! aborts the whole provisioning since a half-configured cluster is not
//! usable.

use crate::cluster::{self, CrcRunner};
use crate::config::Settings;
use crate::constants::{cluster as cluster_cfg, readiness as readiness_cfg};
use crate::download;
use crate::error::{CrcupError, Result};
use crate::outputs;
use crate::readiness::{self, GateConfig};
use crate::trim;
use crate::version::{PinTable, Resolver};
use kube::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub async fn provision(settings: &Settings) -> Result<()> {
    let pins = PinTable::load(settings.pins.as_deref())?;
    let resolver = Resolver::new(&pins, settings.fallback_latest)?;
    let resolved = resolver
        .resolve(&settings.ocp_version, settings.crc_version.as_deref())
        .await?;
    info!(
        "Resolved OpenShift {} to CRC {} ({})",
        resolved.ocp_version,
        resolved.crc_version,
        resolved.source.as_str()
    );
    outputs::publish(&resolved)?;

    // Host tuning is best effort and cannot fail the run
    cluster::host::tune_host().await;

    let acquired = download::acquire(&resolved.crc_version).await?;

    let home = home_dir()?;
    cluster::relocate_state_dirs(&home, Path::new(cluster_cfg::SECONDARY_VOLUME)).await?;

    let crc = CrcRunner::new(acquired.binary);
    crc.configure(&settings.budget()).await?;
    crc.setup().await?;
    crc.start(&settings.pull_secret).await?;

    let client = Client::try_default().await?;
    readiness::wait_for_node_ready(
        &client,
        Duration::from_secs(readiness_cfg::NODE_POLL_INTERVAL_SECS),
    )
    .await?;

    if settings.wait_for_pods_ready {
        readiness::wait_for_pods_ready(
            &client,
            GateConfig::new(
                Duration::from_secs(readiness_cfg::POD_POLL_INTERVAL_SECS),
                Duration::from_secs(readiness_cfg::POD_TIMEOUT_SECS),
            ),
        )
        .await?;
    }

    if settings.wait_for_operators_ready {
        readiness::wait_for_operators_ready(
            &client,
            GateConfig::new(
                Duration::from_secs(readiness_cfg::OPERATOR_POLL_INTERVAL_SECS),
                Duration::from_secs(readiness_cfg::OPERATOR_TIMEOUT_SECS),
            ),
        )
        .await?;
    }

    trim::trim_cluster(&client).await;
    if !settings.bundle_cache {
        trim::reclaim_bundles(&home.join(".crc/cache"));
    }

    info!(
        "Cluster is up: OpenShift {} via CRC {}",
        resolved.ocp_version, resolved.crc_version
    );
    Ok(())
}

fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| CrcupError::Validation("HOME is not set".to_string()))
}
