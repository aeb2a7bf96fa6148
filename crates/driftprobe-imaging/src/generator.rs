// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Variant generator — decodes source images, applies one transform per
// request, encodes the result as JPEG, and writes it atomically. Every
// request is independent, so batches fan out across the rayon pool.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use driftprobe_core::config::{ProbeConfig, TransformParams};
use driftprobe_core::error::{ProbeError, Result};
use driftprobe_core::integrity::hash_bytes;
use driftprobe_core::types::{TransformKind, TransformSpec, variant_file_name};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::codec;
use crate::pixel::PixelBuffer;
use crate::transform;

/// Name of the manifest written next to the variants.
pub const MANIFEST_FILE: &str = "variants.json";

/// One variant to produce.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRequest {
    /// Short identifier, e.g. `fake_hflip`.
    pub label: String,
    pub spec: TransformSpec,
    pub source: PathBuf,
    /// Second image for frequency injection.
    pub fingerprint: Option<PathBuf>,
    pub output: PathBuf,
}

/// Record of a variant that was written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantOutput {
    pub label: String,
    pub spec: TransformSpec,
    pub source: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<PathBuf>,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    /// SHA-256 of the encoded JPEG bytes.
    pub sha256: String,
    pub bytes: usize,
}

/// A rendered and encoded variant that has not been written yet.
#[derive(Debug, Clone)]
pub struct EncodedVariant {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub jpeg: Vec<u8>,
}

/// Produces variant images from [`VariantRequest`]s.
#[derive(Debug, Clone, Copy)]
pub struct VariantGenerator {
    default_quality: u8,
}

impl VariantGenerator {
    /// `default_quality` applies to transforms that do not pin their own
    /// output quality.
    pub fn new(default_quality: u8) -> Result<Self> {
        if !(1..=100).contains(&default_quality) {
            return Err(ProbeError::InvalidParameter(format!(
                "output quality must be within 1..=100, got {default_quality}"
            )));
        }
        Ok(Self { default_quality })
    }

    pub fn from_config(config: &ProbeConfig) -> Result<Self> {
        Self::new(config.output_quality)
    }

    /// Apply `spec` to already-decoded pixels.
    pub fn render(
        &self,
        spec: &TransformSpec,
        source: &PixelBuffer,
        fingerprint: Option<&PixelBuffer>,
    ) -> Result<PixelBuffer> {
        transform::apply(spec, source, fingerprint)
    }

    /// Render and encode, without touching the filesystem.
    pub fn encode(
        &self,
        spec: &TransformSpec,
        source: &PixelBuffer,
        fingerprint: Option<&PixelBuffer>,
    ) -> Result<EncodedVariant> {
        let pixels = self.render(spec, source, fingerprint)?;
        let quality = spec.output_quality(self.default_quality);
        let jpeg = codec::encode_jpeg(&pixels, quality)?;
        Ok(EncodedVariant {
            width: pixels.width(),
            height: pixels.height(),
            quality,
            jpeg,
        })
    }

    /// Produce one variant on disk.
    ///
    /// Sources are decoded fresh for every request and never modified. The
    /// output only appears at `request.output` once it is fully written.
    #[instrument(skip(self, request), fields(label = %request.label, kind = %request.spec.kind()))]
    pub fn generate(&self, request: &VariantRequest) -> Result<VariantOutput> {
        let source = codec::open(&request.source)?;
        let fingerprint = match (&request.fingerprint, request.spec.needs_fingerprint()) {
            (Some(path), true) => Some(codec::open(path)?),
            (None, true) => {
                return Err(ProbeError::InvalidParameter(format!(
                    "{} requires a fingerprint image",
                    request.label
                )));
            }
            (_, false) => None,
        };

        let encoded = self.encode(&request.spec, &source, fingerprint.as_ref())?;
        codec::write_atomic(&request.output, &encoded.jpeg)?;

        let output = VariantOutput {
            label: request.label.clone(),
            spec: request.spec,
            source: request.source.clone(),
            fingerprint: request
                .fingerprint
                .clone()
                .filter(|_| request.spec.needs_fingerprint()),
            path: request.output.clone(),
            width: encoded.width,
            height: encoded.height,
            quality: encoded.quality,
            sha256: hash_bytes(&encoded.jpeg),
            bytes: encoded.jpeg.len(),
        };
        info!(
            path = %output.path.display(),
            bytes = output.bytes,
            "Variant written"
        );
        Ok(output)
    }

    /// Produce every request in parallel. Results come back in request order;
    /// one failure does not stop the others.
    pub fn generate_batch(&self, requests: &[VariantRequest]) -> Vec<Result<VariantOutput>> {
        let results: Vec<Result<VariantOutput>> =
            requests.par_iter().map(|request| self.generate(request)).collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            warn!(failed, total = requests.len(), "Some variants failed");
        } else {
            info!(total = requests.len(), "All variants generated");
        }
        results
    }
}

/// The standard five-variant set: three laundering edits of the fake, plus
/// skin smoothing and fingerprint injection of the real image.
///
/// Output names follow `<source stem>_<transform>.jpg` inside `out_dir`.
pub fn standard_requests(
    real: &Path,
    fake: &Path,
    out_dir: &Path,
    params: &TransformParams,
) -> Vec<VariantRequest> {
    let plan = [
        (fake, TransformKind::HorizontalFlip),
        (fake, TransformKind::Recompress),
        (fake, TransformKind::ResizeDownUp),
        (real, TransformKind::SkinSmooth),
        (real, TransformKind::FreqInject),
    ];

    plan.into_iter()
        .map(|(source, kind)| {
            let stem = source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_owned());
            let file_name = variant_file_name(&stem, kind);
            let spec = params.spec(kind);
            VariantRequest {
                label: file_name.trim_end_matches(".jpg").to_owned(),
                spec,
                source: source.to_path_buf(),
                fingerprint: spec.needs_fingerprint().then(|| fake.to_path_buf()),
                output: out_dir.join(file_name),
            }
        })
        .collect()
}

/// Index of a generation run, written as JSON beside the variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantManifest {
    pub generated_at: DateTime<Utc>,
    pub variants: Vec<VariantOutput>,
}

impl VariantManifest {
    pub fn new(variants: Vec<VariantOutput>) -> Self {
        Self {
            generated_at: Utc::now(),
            variants,
        }
    }

    pub fn find(&self, label: &str) -> Option<&VariantOutput> {
        self.variants.iter().find(|v| v.label == label)
    }

    /// Write to `dir/variants.json`, returning the path.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_vec_pretty(self)?;
        codec::write_atomic(&path, &json)?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        Ok(serde_json::from_slice(&raw)?)
    }
}
