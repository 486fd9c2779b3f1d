// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Drives the `crc` binary: resource configuration, host setup, and start.

use crate::config::ResourceBudget;
use crate::error::Result;
use crate::process;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

pub struct CrcRunner {
    binary: PathBuf,
}

impl CrcRunner {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        process::run_checked(&self.binary.to_string_lossy(), &["config", "set", key, value])
            .await?;
        Ok(())
    }

    /// Write the resource budget into CRC's persistent configuration.
    /// `crc config set` overwrites, so this is safe to run every time.
    #[instrument(skip(self))]
    pub async fn configure(&self, budget: &ResourceBudget) -> Result<()> {
        self.config_set("cpus", &budget.cpus.to_string()).await?;
        self.config_set("memory", &budget.memory_mb.to_string())
            .await?;
        self.config_set("disk-size", &budget.disk_gb.to_string())
            .await?;
        self.config_set("consent-telemetry", budget.telemetry.as_crc_value())
            .await?;
        self.config_set("network-mode", "user").await?;
        info!(
            "CRC configured: {} cpus, {} MiB memory, {} GiB disk",
            budget.cpus, budget.memory_mb, budget.disk_gb
        );
        Ok(())
    }

    /// One-time host preparation (libvirt, networking, bundle unpacking).
    pub async fn setup(&self) -> Result<()> {
        process::run_checked(&self.binary.to_string_lossy(), &["setup"]).await?;
        Ok(())
    }

    /// Start the cluster. The pull secret only ever exists on disk as a
    /// temp file that is removed when this function returns, whatever the
    /// start outcome.
    #[instrument(skip(self, pull_secret))]
    pub async fn start(&self, pull_secret: &str) -> Result<()> {
        let mut secret_file = tempfile::NamedTempFile::new()?;
        secret_file.write_all(pull_secret.as_bytes())?;
        secret_file.flush()?;

        let result = process::run_checked(
            &self.binary.to_string_lossy(),
            &[
                "start",
                "--pull-secret-file",
                &secret_file.path().to_string_lossy(),
            ],
        )
        .await;

        // secret_file is dropped (and unlinked) on both paths
        result.map(|_| ())
    }
}

/// Move CRC's disk-heavy state directories onto the large secondary volume,
/// leaving symlinks behind. Already-relocated directories are skipped.
pub async fn relocate_state_dirs(home: &Path, volume: &Path) -> Result<()> {
    for rel in crate::constants::cluster::RELOCATED_STATE_DIRS {
        relocate_dir(&home.join(rel), &volume.join(rel)).await?;
    }
    Ok(())
}

async fn relocate_dir(source: &Path, target: &Path) -> Result<()> {
    match fs::symlink_metadata(source) {
        Ok(meta) if meta.file_type().is_symlink() => {
            debug!("{} already relocated, skipping", source.display());
            return Ok(());
        }
        Ok(_) => {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            // A crash between a previous move and its symlink leaves a stale
            // target; the source directory is authoritative
            if target.exists() {
                fs::remove_dir_all(target)?;
            }
            process::run_checked(
                "mv",
                &[&source.to_string_lossy(), &target.to_string_lossy()],
            )
            .await?;
        }
        Err(_) => {
            fs::create_dir_all(target)?;
        }
    }

    if let Some(parent) = source.parent() {
        fs::create_dir_all(parent)?;
    }
    std::os::unix::fs::symlink(target, source)?;
    info!("{} -> {}", source.display(), target.display());
    Ok(())
}
