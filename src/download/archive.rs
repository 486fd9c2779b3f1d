// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Archive validation, extraction, and binary installation.

use crate::constants::download as cfg;
use crate::error::{CrcupError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use xz2::read::XzDecoder;

/// Reject artifacts that are too small to be a CRC archive. Mirrors behind
/// misconfigured gateways happily serve HTML error pages with status 200.
pub fn validate_artifact(path: &Path) -> Result<u64> {
    let size = fs::metadata(path)?.len();
    if size < cfg::MIN_ARTIFACT_BYTES {
        return Err(CrcupError::Download(format!(
            "artifact {} is {} bytes, below the {} byte minimum (error page?)",
            path.display(),
            size,
            cfg::MIN_ARTIFACT_BYTES
        )));
    }
    Ok(size)
}

/// Unpack the archive, locate the `crc` executable inside its single
/// top-level directory, and install it at `install_path`.
pub fn install(archive: &Path, install_path: &Path, scratch: &Path) -> Result<PathBuf> {
    let unpack_dir = scratch.join("unpacked");
    fs::create_dir_all(&unpack_dir)?;

    let file = fs::File::open(archive)?;
    let mut tarball = tar::Archive::new(XzDecoder::new(file));
    tarball.unpack(&unpack_dir)?;

    let binary = locate_binary(&unpack_dir)?;
    debug!(
        "Installing {} to {}",
        binary.display(),
        install_path.display()
    );

    // Rename does not cross filesystems; fall back to copy
    if fs::rename(&binary, install_path).is_err() {
        fs::copy(&binary, install_path)?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(install_path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(install_path.to_path_buf())
}

/// The archive is expected to contain exactly one top-level directory
/// (`crc-linux-<version>-amd64/`) with the executable inside it.
fn locate_binary(unpack_dir: &Path) -> Result<PathBuf> {
    let top_level: Vec<PathBuf> = fs::read_dir(unpack_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();

    let [top] = top_level.as_slice() else {
        return Err(CrcupError::Download(format!(
            "expected exactly one top-level directory in archive, found {}",
            top_level.len()
        )));
    };

    let binary = top.join("crc");
    if binary.is_file() {
        Ok(binary)
    } else {
        Err(CrcupError::Download(format!(
            "archive directory {} does not contain a crc executable",
            top.display()
        )))
    }
}
