// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRC configuration, state relocation, and cluster start.

pub mod bringup;
pub mod host;

pub use bringup::{relocate_state_dirs, CrcRunner};
