// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use clap::Parser;
use tracing::info;

use crcup::config::Settings;
use crcup::pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let settings = Settings::parse();
    info!(
        "Starting crcup: OpenShift {} with {} cpus / {} MiB / {} GiB",
        settings.ocp_version, settings.cpus, settings.memory, settings.disk_size
    );

    pipeline::provision(&settings).await?;

    info!("Provisioning complete");
    Ok(())
}
