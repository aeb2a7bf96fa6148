// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `driftprobe evaluate` — run suites against the replay backend and print the
// drift report.

use std::path::{Path, PathBuf};

use chrono::Utc;
use driftprobe_core::error::Result;
use driftprobe_core::integrity::verify_hash;
use driftprobe_detect::{DetectionClient, ReplayDetector};
use driftprobe_eval::fixtures::VARIANTS_DIR;
use driftprobe_eval::{DriftEvaluator, FixtureSet, Suite, SuiteRunner, report};
use driftprobe_imaging::generator::{MANIFEST_FILE, VariantManifest};
use tracing::{debug, info, warn};

use super::load_config;

pub struct EvaluateArgs {
    pub data: PathBuf,
    pub replay: PathBuf,
    pub suites: Vec<Suite>,
    pub api_key: Option<String>,
    pub config: Option<PathBuf>,
}

/// Returns whether every check passed.
pub async fn cmd_evaluate(args: EvaluateArgs) -> Result<bool> {
    let config = load_config(args.config.as_deref())?;

    let fixtures = FixtureSet::standard(&args.data, &config.thresholds);
    for path in fixtures.missing() {
        warn!(path = %path.display(), "Fixture image missing; its checks will fail");
    }

    let verified = verify_variants(&args.data, &fixtures)?;
    info!(verified, "Variant hashes match the manifest");

    let api_key = args.api_key.as_deref().unwrap_or_default();
    let mut detector = ReplayDetector::load(&args.replay)?;
    // Without a pinned credential, the operator's key is the valid one.
    if detector.expected_credential().is_none() {
        detector = detector.with_credential(api_key);
    }
    let client = DetectionClient::new(detector, api_key, config.polling)?;
    let runner = SuiteRunner::new(client, DriftEvaluator::from_config(&config), fixtures);

    let mut outcomes = Vec::with_capacity(args.suites.len());
    for suite in &args.suites {
        outcomes.push(runner.run(*suite).await?);
    }

    print!("{}", report::render(&outcomes, Utc::now()));

    let failed: usize = outcomes.iter().map(|o| o.failed_checks().count()).sum();
    info!(suites = outcomes.len(), failed, "Evaluation finished");
    Ok(failed == 0)
}

/// Check every variant fixture listed in `variants/variants.json` against
/// its recorded SHA-256. Returns how many were checked; a missing manifest
/// checks nothing.
fn verify_variants(data: &Path, fixtures: &FixtureSet) -> Result<usize> {
    let manifest_path = data.join(VARIANTS_DIR).join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        debug!(path = %manifest_path.display(), "No variant manifest; skipping hash check");
        return Ok(0);
    }
    let manifest = VariantManifest::load(&manifest_path)?;

    let mut verified = 0;
    for fixture in fixtures.iter() {
        let Some(entry) = manifest.find(&fixture.label) else {
            continue;
        };
        if !fixture.path.is_file() {
            continue;
        }
        let bytes = std::fs::read(&fixture.path)?;
        verify_hash(&bytes, &entry.sha256).inspect_err(|_| {
            warn!(label = %fixture.label, path = %fixture.path.display(), "Variant changed since generation");
        })?;
        verified += 1;
    }
    Ok(verified)
}
