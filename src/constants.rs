// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Version resolution configuration
pub mod resolver {
    /// Release-listing API for CRC builds
    pub const RELEASE_API_URL: &str = "https://api.github.com/repos/crc-org/crc/releases";
    /// Attempts against the release API before giving up
    pub const API_MAX_ATTEMPTS: u32 = 10;
    /// Delay between release API attempts in seconds
    pub const API_RETRY_DELAY_SECS: u64 = 3;
    /// Oldest OpenShift minor version this tool supports
    pub const MIN_SUPPORTED_MINOR: u32 = 18;
    /// Where users can check which OpenShift versions are supported
    pub const SUPPORTED_VERSIONS_URL: &str = "https://github.com/crc-org/crc/releases";
}

/// Binary download configuration
pub mod download {
    /// Mirror serving released CRC archives
    pub const MIRROR_BASE_URL: &str = "https://mirror.openshift.com/pub/openshift-v4/clients/crc";
    /// Container image carrying cached CRC archives, tagged by version
    pub const CACHE_IMAGE_REPO: &str = "quay.io/crcont/crc-cache";
    /// Archive path inside the cache image
    pub const CACHE_IMAGE_ARCHIVE_PATH: &str = "/opt/crc/crc-linux-amd64.tar.xz";
    /// Mirror attempts before falling back to the cache tier
    pub const MIRROR_MAX_ATTEMPTS: u32 = 3;
    /// Delay between mirror attempts in seconds
    pub const MIRROR_RETRY_DELAY_SECS: u64 = 10;
    /// Anything smaller is an HTML error page, not a CRC archive
    pub const MIN_ARTIFACT_BYTES: u64 = 1024 * 1024;
    /// Where the extracted binary is installed
    pub const INSTALL_PATH: &str = "/usr/local/bin/crc";
}

/// Cluster bring-up paths
pub mod cluster {
    /// CRC state directories that must live on the large secondary volume
    pub const RELOCATED_STATE_DIRS: &[&str] = &[".crc/cache", ".crc/machines"];
    /// Mount point of the secondary volume on the runner
    pub const SECONDARY_VOLUME: &str = "/mnt/crc";
}

/// Readiness gate polling configuration
pub mod readiness {
    /// Fixed interval between node checks in seconds; the node gate has no
    /// top-level timeout
    pub const NODE_POLL_INTERVAL_SECS: u64 = 10;
    /// Pod gate interval in seconds
    pub const POD_POLL_INTERVAL_SECS: u64 = 10;
    /// Pod gate timeout in seconds
    pub const POD_TIMEOUT_SECS: u64 = 20 * 60;
    /// Operator gate interval in seconds
    pub const OPERATOR_POLL_INTERVAL_SECS: u64 = 10;
    /// Operator gate timeout in seconds
    pub const OPERATOR_TIMEOUT_SECS: u64 = 10 * 60;
}

/// The field manager used for server-side patches
pub const MANAGER_NAME: &str = "crcup";
