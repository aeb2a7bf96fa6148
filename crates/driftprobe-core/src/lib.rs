// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// driftprobe — Core types, configuration, and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod integrity;
pub mod types;

pub use config::ProbeConfig;
pub use error::{DetectorErrorCode, ProbeError, Result};
pub use types::*;
