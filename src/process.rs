// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! External command execution for the `crc` and `docker` binaries.

use crate::error::{CrcupError, Result};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Run a command and capture its output. A nonzero exit status is an error
/// carrying the command's stderr.
pub async fn run_checked(program: &str, args: &[&str]) -> Result<String> {
    debug!("Running: {} {}", program, args.join(" "));

    let output = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| CrcupError::Command {
            command: format!("{} {}", program, args.join(" ")),
            detail: format!("failed to spawn: {}", e),
        })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Err(CrcupError::Command {
            command: format!("{} {}", program, args.join(" ")),
            detail: format!(
                "exit code {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        })
    }
}

/// Run a command where failure is tolerated. Returns whether it succeeded;
/// failures are logged and swallowed.
pub async fn run_best_effort(program: &str, args: &[&str]) -> bool {
    match run_checked(program, args).await {
        Ok(_) => true,
        Err(e) => {
            warn!("Best-effort command failed: {}", e);
            false
        }
    }
}

/// Check whether a command exists and runs at all (e.g. `docker --version`).
pub async fn is_available(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_checked_captures_stdout() {
        let out = run_checked("echo", &["hello"]).await.unwrap();
        assert!(out.contains("hello"));
    }

    #[tokio::test]
    async fn test_run_checked_nonzero_is_error() {
        let err = run_checked("false", &[]).await.unwrap_err();
        match err {
            CrcupError::Command { command, .. } => assert!(command.contains("false")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_run_checked_missing_binary_is_error() {
        let err = run_checked("definitely-not-a-real-binary", &[]).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_run_best_effort_swallows_failure() {
        assert!(!run_best_effort("false", &[]).await);
        assert!(run_best_effort("true", &[]).await);
    }
}
