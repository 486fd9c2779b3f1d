// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Conveys resolved versions to downstream CI steps via the
//! `GITHUB_OUTPUT`-style key=value file.

use crate::error::Result;
use crate::version::ResolvedVersion;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Publish the resolved versions for downstream steps. Without a
/// `GITHUB_OUTPUT` file in the environment this is a no-op.
pub fn publish(resolved: &ResolvedVersion) -> Result<()> {
    let Some(path) = std::env::var_os("GITHUB_OUTPUT") else {
        debug!("GITHUB_OUTPUT not set, not publishing outputs");
        return Ok(());
    };

    append_outputs(
        Path::new(&path),
        &[
            ("crc-version", &resolved.crc_version),
            ("ocp-version", &resolved.ocp_version),
            ("version-source", resolved.source.as_str()),
        ],
    )
}

/// Append key=value lines, preserving anything earlier steps wrote.
pub fn append_outputs(path: &Path, outputs: &[(&str, &str)]) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for (key, value) in outputs {
        writeln!(file, "{}={}", key, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_key_value_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output");

        append_outputs(&path, &[("crc-version", "2.52.0"), ("ocp-version", "4.19")]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "crc-version=2.52.0\nocp-version=4.19\n");
    }

    #[test]
    fn test_preserves_existing_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output");
        std::fs::write(&path, "earlier=value\n").unwrap();

        append_outputs(&path, &[("crc-version", "2.52.0")]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("earlier=value\n"));
        assert!(contents.contains("crc-version=2.52.0"));
    }
}
