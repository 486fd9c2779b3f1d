// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Primary download tier: the OpenShift client mirror.

use crate::constants::download as cfg;
use crate::download::{archive, ArtifactSource, Tier};
use crate::error::{CrcupError, Result};
use crate::retry;
use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::info;
use url::Url;

pub struct MirrorSource {
    url: Url,
    http: reqwest::Client,
    policy: retry::Policy,
}

impl MirrorSource {
    pub fn new(crc_version: &str) -> Result<Self> {
        Ok(Self {
            url: mirror_url(crc_version)?,
            http: reqwest::Client::builder()
                .user_agent(concat!("crcup/", env!("CARGO_PKG_VERSION")))
                .build()?,
            policy: retry::Policy::new(
                cfg::MIRROR_MAX_ATTEMPTS,
                Duration::from_secs(cfg::MIRROR_RETRY_DELAY_SECS),
            ),
        })
    }

    async fn fetch_once(&self, dest: &Path) -> Result<()> {
        // Discard any partial file left by a prior attempt
        if tokio::fs::try_exists(dest).await? {
            tokio::fs::remove_file(dest).await?;
        }

        let response = self
            .http
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;

        let size = archive::validate_artifact(dest)?;
        info!("Downloaded {} bytes from {}", size, self.url);
        Ok(())
    }
}

/// Deterministic mirror URL for a CRC version (or the "latest" directory).
pub fn mirror_url(crc_version: &str) -> Result<Url> {
    let raw = format!(
        "{}/{}/crc-linux-amd64.tar.xz",
        cfg::MIRROR_BASE_URL,
        crc_version
    );
    Url::parse(&raw).map_err(|e| CrcupError::Download(format!("bad mirror URL {}: {}", raw, e)))
}

#[async_trait]
impl ArtifactSource for MirrorSource {
    fn tier(&self) -> Tier {
        Tier::Mirror
    }

    async fn available(&self) -> bool {
        // The mirror is assumed reachable; fetch attempts are the probe
        true
    }

    async fn fetch(&self, dest: &Path) -> Result<()> {
        self.policy
            .run("mirror download", |_| self.fetch_once(dest))
            .await
    }
}
