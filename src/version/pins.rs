// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Static mapping from OpenShift version to a known-good CRC version.

use crate::error::{CrcupError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Compiled-in default pin table; `--pins` overrides it with a file.
const BUILTIN_PINS: &str = include_str!("../../pins.json");

#[derive(Debug, Clone, Deserialize)]
pub struct PinTable {
    #[serde(default)]
    version_pins: BTreeMap<String, String>,
    #[serde(default)]
    known_issues: BTreeMap<String, KnownIssue>,
}

/// Diagnostic annotation for CRC versions known to be broken for an
/// OpenShift version. Never alters resolution, only what gets logged.
#[derive(Debug, Clone, Deserialize)]
pub struct KnownIssue {
    pub crc_versions: Vec<String>,
    pub url: String,
}

impl PinTable {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let raw = match path {
            Some(p) => std::fs::read_to_string(p)?,
            None => BUILTIN_PINS.to_string(),
        };
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| CrcupError::Validation(format!("invalid pin table: {}", e)))
    }

    /// Look up the pinned CRC version for an OpenShift version. `"auto"`
    /// entries mean "resolve via the release API" and are reported as absent.
    pub fn lookup(&self, ocp_version: &str) -> Option<&str> {
        self.version_pins
            .get(ocp_version)
            .map(|s| s.as_str())
            .filter(|v| *v != "auto")
    }

    pub fn known_issue(&self, ocp_version: &str) -> Option<&KnownIssue> {
        self.known_issues.get(ocp_version)
    }
}
