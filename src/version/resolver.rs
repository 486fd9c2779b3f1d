// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resolves which CRC version to install for a requested OpenShift version.
//!
//! Priority order: explicit CLI override, pin table, release API, and (only
//! when explicitly enabled) degrade to "latest".

use crate::constants::resolver as cfg;
use crate::error::{CrcupError, Result};
use crate::retry;
use crate::version::pins::PinTable;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    Explicit,
    Pinned,
    ApiResolved,
    FallbackLatest,
}

impl VersionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionSource::Explicit => "explicit",
            VersionSource::Pinned => "pinned",
            VersionSource::ApiResolved => "api-resolved",
            VersionSource::FallbackLatest => "fallback-latest",
        }
    }
}

/// The concrete CRC version to install. `crc_version` is never "auto" by the
/// time this is handed to the download stage.
#[derive(Debug, Clone)]
pub struct ResolvedVersion {
    pub ocp_version: String,
    pub crc_version: String,
    pub source: VersionSource,
}

/// One release as returned by the release-listing API.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub name: Option<String>,
    pub body: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub prerelease: bool,
}

pub struct Resolver<'a> {
    pins: &'a PinTable,
    http: reqwest::Client,
    api_url: String,
    policy: retry::Policy,
    fallback_latest: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(pins: &'a PinTable, fallback_latest: bool) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("crcup/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            pins,
            http,
            api_url: cfg::RELEASE_API_URL.to_string(),
            policy: retry::Policy::new(
                cfg::API_MAX_ATTEMPTS,
                Duration::from_secs(cfg::API_RETRY_DELAY_SECS),
            ),
            fallback_latest,
        })
    }

    #[cfg(test)]
    fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = url.to_string();
        self.policy = retry::Policy::new(1, Duration::from_millis(0));
        self
    }

    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        desired_ocp: &str,
        explicit_crc: Option<&str>,
    ) -> Result<ResolvedVersion> {
        // An explicit CRC version overrides everything
        if let Some(explicit) = explicit_crc {
            info!("Using explicitly requested CRC version {}", explicit);
            return Ok(ResolvedVersion {
                ocp_version: normalize_ocp_version(desired_ocp),
                crc_version: explicit.to_string(),
                source: VersionSource::Explicit,
            });
        }

        let ocp = normalize_ocp_version(desired_ocp);

        if ocp == "latest" {
            return self.resolve_latest().await;
        }

        validate_supported(&ocp)?;

        if let Some(pinned) = self.pins.lookup(&ocp) {
            info!("OpenShift {} is pinned to CRC {}", ocp, pinned);
            let resolved = ResolvedVersion {
                ocp_version: ocp,
                crc_version: pinned.to_string(),
                source: VersionSource::Pinned,
            };
            self.warn_known_issues(&resolved);
            return Ok(resolved);
        }

        match self.resolve_via_api(&ocp).await {
            Ok(resolved) => {
                self.warn_known_issues(&resolved);
                Ok(resolved)
            }
            Err(e) if self.fallback_latest => {
                warn!(
                    "Release API resolution failed ({}), degrading to \"latest\" as requested",
                    e
                );
                Ok(ResolvedVersion {
                    ocp_version: ocp,
                    crc_version: "latest".to_string(),
                    source: VersionSource::FallbackLatest,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// "latest": a concrete pin wins; otherwise ask the API for the newest
    /// release, and fall back to the mirror's "latest" directory if the API
    /// is unreachable.
    async fn resolve_latest(&self) -> Result<ResolvedVersion> {
        if let Some(pinned) = self.pins.lookup("latest") {
            info!("\"latest\" is pinned to CRC {}", pinned);
            return Ok(ResolvedVersion {
                ocp_version: "latest".to_string(),
                crc_version: pinned.to_string(),
                source: VersionSource::Pinned,
            });
        }

        match self.fetch_releases().await {
            Ok(releases) => {
                let newest = releases
                    .iter()
                    .filter(|r| !r.prerelease)
                    .max_by_key(|r| r.published_at)
                    .ok_or_else(|| {
                        CrcupError::Resolution("release API returned no releases".to_string())
                    })?;
                Ok(ResolvedVersion {
                    ocp_version: "latest".to_string(),
                    crc_version: strip_tag(&newest.tag_name),
                    source: VersionSource::ApiResolved,
                })
            }
            Err(e) => {
                warn!(
                    "Release API unreachable ({}), using the mirror's \"latest\" directory",
                    e
                );
                Ok(ResolvedVersion {
                    ocp_version: "latest".to_string(),
                    crc_version: "latest".to_string(),
                    source: VersionSource::FallbackLatest,
                })
            }
        }
    }

    async fn resolve_via_api(&self, ocp: &str) -> Result<ResolvedVersion> {
        let releases = self.fetch_releases().await?;

        let release = select_release(&releases, ocp).ok_or_else(|| {
            CrcupError::Resolution(format!(
                "no CRC release references OpenShift {}; supported versions: {}",
                ocp,
                cfg::SUPPORTED_VERSIONS_URL
            ))
        })?;

        let crc_version = strip_tag(&release.tag_name);
        info!(
            "Release API resolved OpenShift {} to CRC {}",
            ocp, crc_version
        );

        Ok(ResolvedVersion {
            ocp_version: ocp.to_string(),
            crc_version,
            source: VersionSource::ApiResolved,
        })
    }

    async fn fetch_releases(&self) -> Result<Vec<Release>> {
        let url = format!("{}?per_page=100", self.api_url);
        self.policy
            .run("release API request", |_| {
                let http = self.http.clone();
                let url = url.clone();
                async move {
                    let releases = http
                        .get(&url)
                        .send()
                        .await?
                        .error_for_status()?
                        .json::<Vec<Release>>()
                        .await?;
                    Ok::<_, CrcupError>(releases)
                }
            })
            .await
    }

    fn warn_known_issues(&self, resolved: &ResolvedVersion) {
        if let Some(issue) = self.pins.known_issue(&resolved.ocp_version) {
            if issue.crc_versions.iter().any(|v| *v == resolved.crc_version) {
                warn!(
                    "CRC {} has known issues with OpenShift {}, see {}",
                    resolved.crc_version, resolved.ocp_version, issue.url
                );
            }
        }
    }
}

/// Two-component versions with a single-digit fraction >= 2 had their
/// trailing zero swallowed by numeric parsing upstream: "4.2" means "4.20".
pub fn normalize_ocp_version(version: &str) -> String {
    if let Some(("4", minor)) = version.split_once('.') {
        if minor.len() == 1 && minor.chars().all(|c| c.is_ascii_digit()) && minor >= "2" {
            return format!("4.{}0", minor);
        }
    }
    version.to_string()
}

/// Accept "4.<minor>" with minor >= the supported floor.
pub fn validate_supported(version: &str) -> Result<()> {
    let guidance = format!(
        "expected \"latest\" or \"4.<minor>\" with minor >= {}; see {}",
        cfg::MIN_SUPPORTED_MINOR,
        cfg::SUPPORTED_VERSIONS_URL
    );

    let Some((major, minor)) = version.split_once('.') else {
        return Err(CrcupError::Validation(format!(
            "\"{}\" is not a version: {}",
            version, guidance
        )));
    };

    let supported = major == "4"
        && minor
            .parse::<u32>()
            .is_ok_and(|m| m >= cfg::MIN_SUPPORTED_MINOR);

    if supported {
        Ok(())
    } else {
        Err(CrcupError::Validation(format!(
            "OpenShift {} is not supported: {}",
            version, guidance
        )))
    }
}

/// Pick the release for an OpenShift minor, preferring (a) a release name
/// ending in "-<major>.<minor>.<patch>" over (b) a body mention of
/// "OpenShift <major>.<minor>.<patch>". Most recently published wins.
pub fn select_release<'r>(releases: &'r [Release], ocp_minor: &str) -> Option<&'r Release> {
    let by_name = releases
        .iter()
        .filter(|r| name_matches(r, ocp_minor))
        .max_by_key(|r| r.published_at);

    by_name.or_else(|| {
        releases
            .iter()
            .filter(|r| body_matches(r, ocp_minor))
            .max_by_key(|r| r.published_at)
    })
}

fn name_matches(release: &Release, ocp_minor: &str) -> bool {
    let Some(name) = release.name.as_deref() else {
        return false;
    };
    let Some((_, tail)) = name.rsplit_once('-') else {
        return false;
    };
    is_patch_of(tail.trim(), ocp_minor)
}

fn body_matches(release: &Release, ocp_minor: &str) -> bool {
    let Some(body) = release.body.as_deref() else {
        return false;
    };
    body.split("OpenShift ")
        .skip(1)
        .any(|rest| is_patch_of(rest.split_whitespace().next().unwrap_or(""), ocp_minor))
}

/// "4.19.3" is a patch of minor "4.19"; "4.190.0" is not. Trailing prose
/// punctuation after the patch digits is tolerated.
fn is_patch_of(candidate: &str, ocp_minor: &str) -> bool {
    candidate
        .strip_prefix(ocp_minor)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|patch| patch.starts_with(|c: char| c.is_ascii_digit()))
}

fn strip_tag(tag: &str) -> String {
    tag.strip_prefix('v').unwrap_or(tag).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn release(tag: &str, name: &str, body: &str, day: u32) -> Release {
        Release {
            tag_name: tag.to_string(),
            name: Some(name.to_string()),
            body: Some(body.to_string()),
            published_at: Some(Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap()),
            prerelease: false,
        }
    }

    fn pins(raw: &str) -> PinTable {
        PinTable::parse(raw).unwrap()
    }

    #[test]
    fn test_normalize_single_digit_minors() {
        assert_eq!(normalize_ocp_version("4.2"), "4.20");
        assert_eq!(normalize_ocp_version("4.3"), "4.30");
        assert_eq!(normalize_ocp_version("4.9"), "4.90");
    }

    #[test]
    fn test_normalize_leaves_others_alone() {
        assert_eq!(normalize_ocp_version("4.19"), "4.19");
        assert_eq!(normalize_ocp_version("4.1"), "4.1");
        assert_eq!(normalize_ocp_version("4.20"), "4.20");
        assert_eq!(normalize_ocp_version("latest"), "latest");
        assert_eq!(normalize_ocp_version("5.2"), "5.2");
    }

    #[test]
    fn test_validate_supported() {
        assert!(validate_supported("4.18").is_ok());
        assert!(validate_supported("4.20").is_ok());
        assert!(validate_supported("4.17").is_err());
        assert!(validate_supported("4.1").is_err());
        assert!(validate_supported("3.11").is_err());
        assert!(validate_supported("banana").is_err());
    }

    #[test]
    fn test_validation_error_carries_guidance() {
        let err = validate_supported("4.2junk").unwrap_err();
        assert!(err.to_string().contains("https://"));
    }

    #[test]
    fn test_select_release_by_name_suffix() {
        let releases = vec![
            release("v2.52.0", "CRC 2.52.0 - 4.19.3", "", 10),
            release("v2.54.0", "CRC 2.54.0 - 4.20.0", "", 20),
        ];
        assert_eq!(
            select_release(&releases, "4.19").unwrap().tag_name,
            "v2.52.0"
        );
    }

    #[test]
    fn test_select_release_by_body_mention() {
        let releases = vec![release(
            "v2.51.0",
            "CRC 2.51.0",
            "This build ships OpenShift 4.19.2 with bug fixes.",
            5,
        )];
        assert_eq!(
            select_release(&releases, "4.19").unwrap().tag_name,
            "v2.51.0"
        );
    }

    #[test]
    fn test_name_match_outranks_body_match() {
        let releases = vec![
            release("v2.50.0", "CRC 2.50.0", "Mentions OpenShift 4.19.1 in text.", 25),
            release("v2.52.0", "CRC 2.52.0 - 4.19.3", "", 10),
        ];
        // The body match is newer but the name rule has priority
        assert_eq!(
            select_release(&releases, "4.19").unwrap().tag_name,
            "v2.52.0"
        );
    }

    #[test]
    fn test_select_release_most_recent_wins() {
        let releases = vec![
            release("v2.49.0", "CRC 2.49.0 - 4.19.0", "", 1),
            release("v2.52.0", "CRC 2.52.0 - 4.19.3", "", 15),
        ];
        assert_eq!(
            select_release(&releases, "4.19").unwrap().tag_name,
            "v2.52.0"
        );
    }

    #[test]
    fn test_select_release_rejects_longer_minor() {
        // "4.190.0" must not match a request for 4.19
        let releases = vec![release("v9.9.9", "CRC 9.9.9 - 4.190.0", "", 1)];
        assert!(select_release(&releases, "4.19").is_none());
    }

    #[tokio::test]
    async fn test_explicit_version_overrides_pins() {
        let pins = pins(r#"{"version_pins": {"4.19": "2.52.0"}}"#);
        let resolver = Resolver::new(&pins, false).unwrap();

        let resolved = resolver.resolve("4.19", Some("2.40.0")).await.unwrap();
        assert_eq!(resolved.crc_version, "2.40.0");
        assert_eq!(resolved.source, VersionSource::Explicit);
    }

    #[tokio::test]
    async fn test_pinned_version_makes_no_network_call() {
        let pins = pins(r#"{"version_pins": {"4.19": "2.54.0"}}"#);
        // An unroutable API URL: any network attempt would fail the test
        let resolver = Resolver::new(&pins, false)
            .unwrap()
            .with_api_url("http://127.0.0.1:1");

        let resolved = resolver.resolve("4.19", None).await.unwrap();
        assert_eq!(resolved.crc_version, "2.54.0");
        assert_eq!(resolved.source, VersionSource::Pinned);
    }

    #[tokio::test]
    async fn test_latest_pinned() {
        let pins = pins(r#"{"version_pins": {"latest": "2.54.0"}}"#);
        let resolver = Resolver::new(&pins, false)
            .unwrap()
            .with_api_url("http://127.0.0.1:1");

        let resolved = resolver.resolve("latest", None).await.unwrap();
        assert_eq!(resolved.crc_version, "2.54.0");
        assert_eq!(resolved.source, VersionSource::Pinned);
    }

    #[tokio::test]
    async fn test_latest_auto_never_returns_auto() {
        // "latest": "auto" forces an API lookup; with the API unreachable the
        // documented fallback is the literal "latest", never "auto"
        let pins = pins(r#"{"version_pins": {"latest": "auto"}}"#);
        let resolver = Resolver::new(&pins, false)
            .unwrap()
            .with_api_url("http://127.0.0.1:1");

        let resolved = resolver.resolve("latest", None).await.unwrap();
        assert_eq!(resolved.crc_version, "latest");
        assert_eq!(resolved.source, VersionSource::FallbackLatest);
    }

    #[tokio::test]
    async fn test_unpinned_version_fails_without_api() {
        let pins = pins(r#"{"version_pins": {"4.20": "auto"}}"#);
        let resolver = Resolver::new(&pins, false)
            .unwrap()
            .with_api_url("http://127.0.0.1:1");

        let err = resolver.resolve("4.20", None).await.unwrap_err();
        assert!(matches!(err, CrcupError::Http(_)));
    }

    #[tokio::test]
    async fn test_unpinned_version_degrades_when_asked() {
        let pins = pins(r#"{"version_pins": {"4.20": "auto"}}"#);
        let resolver = Resolver::new(&pins, true)
            .unwrap()
            .with_api_url("http://127.0.0.1:1");

        let resolved = resolver.resolve("4.20", None).await.unwrap();
        assert_eq!(resolved.crc_version, "latest");
        assert_eq!(resolved.source, VersionSource::FallbackLatest);
    }

    #[tokio::test]
    async fn test_unsupported_version_rejected() {
        let pins = pins("{}");
        let resolver = Resolver::new(&pins, false).unwrap();

        let err = resolver.resolve("4.12", None).await.unwrap_err();
        assert!(matches!(err, CrcupError::Validation(_)));
    }

    #[tokio::test]
    async fn test_normalization_applies_before_lookup() {
        // "4.2" means 4.20, so the 4.20 pin must be found
        let pins = pins(r#"{"version_pins": {"4.20": "2.54.0"}}"#);
        let resolver = Resolver::new(&pins, false)
            .unwrap()
            .with_api_url("http://127.0.0.1:1");

        let resolved = resolver.resolve("4.2", None).await.unwrap();
        assert_eq!(resolved.ocp_version, "4.20");
        assert_eq!(resolved.crc_version, "2.54.0");
        assert_eq!(resolved.source, VersionSource::Pinned);
    }
}
