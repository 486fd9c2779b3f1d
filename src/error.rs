// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrcupError {
    #[error("Invalid version input: {0}")]
    Validation(String),

    #[error("Version resolution failed: {0}")]
    Resolution(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Timed out waiting for cluster readiness: {0}")]
    Timeout(String),

    #[error("Command `{command}` failed: {detail}")]
    Command { command: String, detail: String },

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CrcupError>;
