// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Failover download tier: a container image carrying the CRC archive.

use crate::constants::download as cfg;
use crate::download::{archive, ArtifactSource, Tier};
use crate::error::Result;
use crate::process;
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

pub struct CacheImageSource {
    image: String,
}

impl CacheImageSource {
    pub fn new(crc_version: &str) -> Self {
        Self {
            image: format!("{}:{}", cfg::CACHE_IMAGE_REPO, crc_version),
        }
    }
}

#[async_trait]
impl ArtifactSource for CacheImageSource {
    fn tier(&self) -> Tier {
        Tier::Cache
    }

    /// A manifest inspection confirms the tag exists before any pull, so an
    /// absent cache image costs one API round-trip instead of a doomed pull.
    async fn available(&self) -> bool {
        if !process::is_available("docker").await {
            debug!("docker not present, cache tier unavailable");
            return false;
        }
        process::run_checked("docker", &["manifest", "inspect", &self.image])
            .await
            .is_ok()
    }

    async fn fetch(&self, dest: &Path) -> Result<()> {
        info!("Pulling cache image {}", self.image);
        process::run_checked("docker", &["pull", "--quiet", &self.image]).await?;

        let container = process::run_checked("docker", &["create", &self.image])
            .await?
            .trim()
            .to_string();

        let copied = process::run_checked(
            "docker",
            &[
                "cp",
                &format!("{}:{}", container, cfg::CACHE_IMAGE_ARCHIVE_PATH),
                &dest.to_string_lossy(),
            ],
        )
        .await;

        // The container is removed whether or not the copy worked
        process::run_best_effort("docker", &["rm", "-f", &container]).await;
        copied?;

        archive::validate_artifact(dest)?;
        Ok(())
    }
}
