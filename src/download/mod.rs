// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Two-tier acquisition of the CRC binary: primary HTTPS mirror with a
//! cached container image as failover.

pub mod archive;
pub mod cache_image;
pub mod mirror;

use crate::constants::download as cfg;
use crate::error::{CrcupError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Mirror,
    Cache,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Mirror => "mirror",
            Tier::Cache => "cache",
        }
    }
}

/// One acquisition path for the CRC archive. Sources retry internally;
/// the orchestrator only sequences them.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    fn tier(&self) -> Tier;

    /// Cheap existence probe. Used as a preflight diagnostic and to skip a
    /// guaranteed-404 fetch.
    async fn available(&self) -> bool;

    /// Fetch the archive to `dest`.
    async fn fetch(&self, dest: &Path) -> Result<()>;
}

/// Where the binary ended up and which tier produced it.
#[derive(Debug)]
pub struct Acquired {
    pub binary: PathBuf,
    pub tier: Tier,
}

/// Download the CRC archive for `crc_version` and install the binary.
pub async fn acquire(crc_version: &str) -> Result<Acquired> {
    let mirror = mirror::MirrorSource::new(crc_version)?;
    let cache = cache_image::CacheImageSource::new(crc_version);
    acquire_from(
        &[&mirror, &cache],
        Path::new(cfg::INSTALL_PATH),
    )
    .await
}

/// Try each source in order until one yields a valid archive, then extract
/// and install the binary. Scratch space lives in a temp dir that is removed
/// when this function returns, on success and on failure alike.
#[instrument(skip(sources))]
pub async fn acquire_from(
    sources: &[&dyn ArtifactSource],
    install_path: &Path,
) -> Result<Acquired> {
    let scratch = tempfile::tempdir()?;

    // Preflight: report up front whether a fallback exists, so a mirror
    // outage in the log is immediately actionable. Attempt order is
    // unchanged by this.
    for source in sources.iter().skip(1) {
        if source.available().await {
            info!("Fallback via {} tier is available", source.tier().as_str());
        } else {
            warn!(
                "Fallback via {} tier is NOT available, only the primary can succeed",
                source.tier().as_str()
            );
        }
    }

    for source in sources {
        let tier = source.tier();
        if !source.available().await {
            warn!("{} tier not available, skipping", tier.as_str());
            continue;
        }

        let archive_path = scratch.path().join("crc-linux-amd64.tar.xz");
        match source.fetch(&archive_path).await {
            Ok(()) => {
                let binary = archive::install(&archive_path, install_path, scratch.path())?;
                match tier {
                    Tier::Mirror => info!("Installed CRC binary at {}", binary.display()),
                    Tier::Cache => info!(
                        "Installed CRC binary at {} via cache failover",
                        binary.display()
                    ),
                }
                return Ok(Acquired { binary, tier });
            }
            Err(e) => {
                warn!("{} tier failed: {}", tier.as_str(), e);
            }
        }
    }

    Err(CrcupError::Download(
        "all download tiers exhausted".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct FakeSource {
        tier: Tier,
        available: bool,
        succeed: bool,
        fetches: AtomicU32,
        order: &'static Mutex<Vec<Tier>>,
    }

    #[async_trait]
    impl ArtifactSource for FakeSource {
        fn tier(&self) -> Tier {
            self.tier
        }

        async fn available(&self) -> bool {
            self.available
        }

        async fn fetch(&self, dest: &Path) -> Result<()> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.order.lock().unwrap().push(self.tier);
            if self.succeed {
                archive::tests::write_test_archive(dest, "2.52.0");
                Ok(())
            } else {
                Err(CrcupError::Download("fake failure".to_string()))
            }
        }
    }

    fn fake(
        tier: Tier,
        available: bool,
        succeed: bool,
        order: &'static Mutex<Vec<Tier>>,
    ) -> FakeSource {
        FakeSource {
            tier,
            available,
            succeed,
            fetches: AtomicU32::new(0),
            order,
        }
    }

    fn order_log() -> &'static Mutex<Vec<Tier>> {
        Box::leak(Box::new(Mutex::new(Vec::new())))
    }

    #[tokio::test]
    async fn test_primary_tier_wins_when_it_succeeds() {
        let order = order_log();
        let mirror = fake(Tier::Mirror, true, true, order);
        let cache = fake(Tier::Cache, true, true, order);
        let dir = tempfile::tempdir().unwrap();
        let install = dir.path().join("crc");

        let acquired = acquire_from(&[&mirror, &cache], &install).await.unwrap();

        assert_eq!(acquired.tier, Tier::Mirror);
        assert_eq!(cache.fetches.load(Ordering::SeqCst), 0);
        assert!(install.is_file());
    }

    #[tokio::test]
    async fn test_cache_tier_only_after_mirror_exhausted() {
        let order = order_log();
        let mirror = fake(Tier::Mirror, true, false, order);
        let cache = fake(Tier::Cache, true, true, order);
        let dir = tempfile::tempdir().unwrap();
        let install = dir.path().join("crc");

        let acquired = acquire_from(&[&mirror, &cache], &install).await.unwrap();

        assert_eq!(acquired.tier, Tier::Cache);
        assert_eq!(*order.lock().unwrap(), vec![Tier::Mirror, Tier::Cache]);
    }

    #[tokio::test]
    async fn test_unavailable_cache_is_skipped_not_fatal() {
        let order = order_log();
        let mirror = fake(Tier::Mirror, true, false, order);
        let cache = fake(Tier::Cache, false, true, order);
        let dir = tempfile::tempdir().unwrap();
        let install = dir.path().join("crc");

        let err = acquire_from(&[&mirror, &cache], &install).await.unwrap_err();

        // The missing fallback is reported as exhaustion, and the cache
        // fetch was never attempted
        assert!(matches!(err, CrcupError::Download(_)));
        assert_eq!(cache.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_tiers_exhausted() {
        let order = order_log();
        let mirror = fake(Tier::Mirror, true, false, order);
        let cache = fake(Tier::Cache, true, false, order);
        let dir = tempfile::tempdir().unwrap();
        let install = dir.path().join("crc");

        let err = acquire_from(&[&mirror, &cache], &install).await.unwrap_err();
        assert!(err.to_string().contains("exhausted"));
    }
}
