// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Frequency-residual injection ("freq_inject") — extract the high-frequency
// fingerprint of one image (raw minus blurred) and add a small, scaled amount
// of it to another.
//
// Residuals are signed. Scaling and addition happen in i32/f64 and are
// clamped back to [0, 255]; nothing ever wraps.

use driftprobe_core::error::{ProbeError, Result};
use tracing::{debug, info, instrument};

use super::geometric::resample;
use crate::pixel::{PixelBuffer, clamp_to_byte, gaussian_blur, round_half_up};

/// Signed high-frequency component of an image, one value per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Residual {
    width: u32,
    height: u32,
    data: Vec<i16>,
}

impl Residual {
    /// `raw - blurred`, sample by sample.
    pub fn between(raw: &PixelBuffer, blurred: &PixelBuffer) -> Result<Self> {
        let data = raw.signed_difference(blurred)?;
        Ok(Self {
            width: raw.width(),
            height: raw.height(),
            data,
        })
    }

    /// Blur `source` at `sigma` and keep what the blur removed.
    pub fn extract(source: &PixelBuffer, sigma: f32) -> Result<Self> {
        let blurred = gaussian_blur(source, sigma)?;
        Self::between(source, &blurred)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn samples(&self) -> &[i16] {
        &self.data
    }

    /// Mean absolute residual, a rough measure of texture energy.
    pub fn mean_magnitude(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let total: u64 = self.data.iter().map(|&r| r.unsigned_abs() as u64).sum();
        total as f64 / self.data.len() as f64
    }
}

/// `clamp(target + round(residual * weight), 0, 255)` for every sample.
///
/// Rounding is half up. Fails with `DimensionMismatch` if the residual does
/// not cover the target exactly.
pub fn inject(target: &PixelBuffer, residual: &Residual, weight: f64) -> Result<PixelBuffer> {
    if !weight.is_finite() {
        return Err(ProbeError::InvalidParameter(format!(
            "injection weight must be finite, got {weight}"
        )));
    }
    if residual.dimensions() != target.dimensions() {
        return Err(ProbeError::DimensionMismatch {
            expected: target.dimensions(),
            actual: residual.dimensions(),
        });
    }

    let data = target
        .as_bytes()
        .iter()
        .zip(residual.samples())
        .map(|(&t, &r)| clamp_to_byte((t as i32).saturating_add(round_half_up(r as f64 * weight))))
        .collect();
    PixelBuffer::new(target.width(), target.height(), data)
}

/// Inject `weight` times the residual of `fingerprint` (blurred at `sigma`)
/// into `target`.
///
/// If the fingerprint has different dimensions it is first resampled
/// bilinearly to the target's exact size.
#[instrument(
    skip(target, fingerprint),
    fields(
        target_w = target.width(),
        target_h = target.height(),
        fingerprint_w = fingerprint.width(),
        fingerprint_h = fingerprint.height(),
        sigma,
        weight
    )
)]
pub fn freq_inject(
    target: &PixelBuffer,
    fingerprint: &PixelBuffer,
    sigma: f32,
    weight: f64,
) -> Result<PixelBuffer> {
    let (width, height) = target.dimensions();
    let aligned = resample(fingerprint, width, height)?;

    let residual = Residual::extract(&aligned, sigma)?;
    info!(
        mean_magnitude = residual.mean_magnitude(),
        "Fingerprint residual extracted"
    );

    let out = inject(target, &residual, weight)?;
    debug!("Residual injected");
    Ok(out)
}
