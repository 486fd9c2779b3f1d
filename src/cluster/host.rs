// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Best-effort host tuning for the tight CI runner budget.
//!
//! Every command here is fire and forget: a failure is logged and the
//! bring-up continues. None of these are load-bearing, they just buy back
//! memory and disk on the runner.

use crate::process;
use tracing::info;

/// Swap file backing the overcommitted VM memory
const SWAP_FILE: &str = "/mnt/crcup-swap";

const TUNING_COMMANDS: &[&[&str]] = &[
    // Extra swap on the large volume
    &["sudo", "fallocate", "-l", "8G", SWAP_FILE],
    &["sudo", "chmod", "600", SWAP_FILE],
    &["sudo", "mkswap", SWAP_FILE],
    &["sudo", "swapon", SWAP_FILE],
    // Let the VM overcommit
    &["sudo", "sysctl", "-w", "vm.overcommit_memory=1"],
    &["sudo", "sysctl", "-w", "vm.swappiness=10"],
    // Services the runner does not need while the cluster runs
    &["sudo", "systemctl", "stop", "unattended-upgrades.service"],
    &["sudo", "systemctl", "stop", "packagekit.service"],
    // Preinstalled toolchains eating the root volume
    &[
        "sudo",
        "rm",
        "-rf",
        "/usr/share/dotnet",
        "/usr/local/lib/android",
        "/opt/ghc",
    ],
    &["sudo", "apt-get", "-y", "autoremove"],
];

/// Apply all tuning commands, tolerating individual failures.
pub async fn tune_host() {
    let succeeded = run_tuning(TUNING_COMMANDS).await;
    info!(
        "Host tuning: {}/{} steps succeeded",
        succeeded,
        TUNING_COMMANDS.len()
    );
}

async fn run_tuning(commands: &[&[&str]]) -> usize {
    let mut succeeded = 0;
    for command in commands {
        let Some((program, args)) = command.split_first() else {
            continue;
        };
        if process::run_best_effort(program, args).await {
            succeeded += 1;
        }
    }
    succeeded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failures_are_tolerated() {
        let commands: &[&[&str]] = &[&["true"], &["false"], &["true"]];
        assert_eq!(run_tuning(commands).await, 2);
    }

    #[tokio::test]
    async fn test_missing_binary_is_tolerated() {
        let commands: &[&[&str]] = &[&["definitely-not-a-real-binary"]];
        assert_eq!(run_tuning(commands).await, 0);
    }
}
