// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `driftprobe generate` — write the standard variant set and its manifest.

use std::path::PathBuf;
use std::time::Instant;

use driftprobe_core::error::{ProbeError, Result};
use driftprobe_core::types::TransformKind;
use driftprobe_imaging::generator::{VariantGenerator, VariantManifest, standard_requests};
use tracing::{info, warn};

use super::load_config;

pub struct GenerateArgs {
    pub real: PathBuf,
    pub fake: PathBuf,
    pub out: PathBuf,
    pub config: Option<PathBuf>,
    /// Empty means every transform.
    pub only: Vec<TransformKind>,
    pub threads: Option<usize>,
}

/// Fails with the first variant error, after the successful variants and the
/// manifest have been written.
pub fn cmd_generate(args: GenerateArgs) -> Result<()> {
    let started = Instant::now();
    let config = load_config(args.config.as_deref())?;

    if let Some(num_threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| ProbeError::Config(format!("failed to configure thread pool: {e}")))?;
        info!(num_threads, "Thread pool configured");
    }

    let requests: Vec<_> = standard_requests(&args.real, &args.fake, &args.out, &config.transforms)
        .into_iter()
        .filter(|r| args.only.is_empty() || args.only.contains(&r.spec.kind()))
        .collect();
    info!(count = requests.len(), out = %args.out.display(), "Generating variants");

    let generator = VariantGenerator::from_config(&config)?;
    let mut written = Vec::with_capacity(requests.len());
    let mut first_error = None;
    for (request, result) in requests.iter().zip(generator.generate_batch(&requests)) {
        match result {
            Ok(output) => {
                println!(
                    "  {:<24} {}x{}  q{}  {}",
                    output.label,
                    output.width,
                    output.height,
                    output.quality,
                    output.path.display()
                );
                written.push(output);
            }
            Err(err) => {
                warn!(label = %request.label, error = %err, "Variant failed");
                eprintln!("  {:<24} FAILED: {err}", request.label);
                first_error.get_or_insert(err);
            }
        }
    }

    let manifest = VariantManifest::new(written);
    let manifest_path = manifest.write(&args.out)?;
    println!(
        "{} variant(s) written in {:.2}s; manifest {}",
        manifest.variants.len(),
        started.elapsed().as_secs_f64(),
        manifest_path.display()
    );

    match first_error {
        None => Ok(()),
        Some(err) => Err(err),
    }
}
