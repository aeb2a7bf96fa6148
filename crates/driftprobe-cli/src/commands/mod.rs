// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand implementations.

pub mod evaluate;
pub mod generate;

use std::path::Path;

use driftprobe_core::ProbeConfig;
use driftprobe_core::error::Result;
use tracing::info;

/// Load `path` if given, otherwise the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<ProbeConfig> {
    match path {
        Some(path) => {
            let config = ProbeConfig::load(path)?;
            info!(path = %path.display(), "Configuration loaded");
            Ok(config)
        }
        None => Ok(ProbeConfig::default()),
    }
}
