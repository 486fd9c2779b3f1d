// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRC version selection: pin table, normalization, and release API lookup.

pub mod pins;
pub mod resolver;

pub use pins::PinTable;
pub use resolver::{ResolvedVersion, Resolver, VersionSource};
