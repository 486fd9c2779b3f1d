// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CLI surface. String-typed booleans and enums from the CI configuration
//! layer are parsed here, once, into real types.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Provision a single-node OpenShift Local cluster on a CI runner.
#[derive(Parser, Debug, Clone)]
#[command(name = "crcup", version, about)]
pub struct Settings {
    /// OpenShift pull secret
    #[arg(long, env = "CRCUP_PULL_SECRET", hide_env_values = true)]
    pub pull_secret: String,

    /// Desired OpenShift version: "latest" or "4.<minor>"
    #[arg(long, default_value = "latest")]
    pub ocp_version: String,

    /// Explicit CRC version; overrides pin table and API resolution
    #[arg(long)]
    pub crc_version: Option<String>,

    /// VM CPU count
    #[arg(long, default_value_t = 4)]
    pub cpus: u32,

    /// VM memory in MiB
    #[arg(long, default_value_t = 10752)]
    pub memory: u32,

    /// VM disk size in GiB
    #[arg(long, default_value_t = 31)]
    pub disk_size: u32,

    /// Whether CRC may send telemetry
    #[arg(long, value_enum, default_value = "yes")]
    pub telemetry: Telemetry,

    /// Keep the downloaded bundle archive after start ("true"/"false")
    #[arg(long, default_value = "false", action = clap::ArgAction::Set, value_parser = parse_ci_bool)]
    pub bundle_cache: bool,

    /// Block until all essential pods are Running or Completed
    #[arg(long, default_value = "false", action = clap::ArgAction::Set, value_parser = parse_ci_bool)]
    pub wait_for_pods_ready: bool,

    /// Block until all cluster operators are Available and not Progressing
    #[arg(long, default_value = "false", action = clap::ArgAction::Set, value_parser = parse_ci_bool)]
    pub wait_for_operators_ready: bool,

    /// Degrade to crc-version "latest" when API resolution fails instead of
    /// failing the run
    #[arg(long, default_value = "false", action = clap::ArgAction::Set, value_parser = parse_ci_bool)]
    pub fallback_latest: bool,

    /// Override the built-in version pin table with a JSON file
    #[arg(long)]
    pub pins: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Telemetry {
    Yes,
    No,
}

impl Telemetry {
    /// The value `crc config set consent-telemetry` expects
    pub fn as_crc_value(&self) -> &'static str {
        match self {
            Telemetry::Yes => "yes",
            Telemetry::No => "no",
        }
    }
}

/// Resource knobs passed through unchanged to the cluster bring-up call.
#[derive(Debug, Clone, Copy)]
pub struct ResourceBudget {
    pub cpus: u32,
    pub memory_mb: u32,
    pub disk_gb: u32,
    pub telemetry: Telemetry,
}

impl Settings {
    pub fn budget(&self) -> ResourceBudget {
        ResourceBudget {
            cpus: self.cpus,
            memory_mb: self.memory,
            disk_gb: self.disk_size,
            telemetry: self.telemetry,
        }
    }
}

/// The CI surface passes booleans as the strings "true"/"false".
fn parse_ci_bool(value: &str) -> Result<bool, String> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(format!("expected \"true\" or \"false\", got \"{}\"", other)),
    }
}
