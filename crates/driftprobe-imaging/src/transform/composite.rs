// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Masked blur composite ("skin_smooth") — erases natural high-frequency
// texture inside a fixed elliptical region so the effect of texture absence
// alone on the classifier can be measured.

use driftprobe_core::error::{ProbeError, Result};
use driftprobe_core::types::EllipseRegion;
use tracing::{debug, info, instrument};

use crate::pixel::{CHANNELS, PixelBuffer, RegionMask, gaussian_blur, round_half_up};

/// Per pixel and channel: `mask * overlay + (1 - mask) * base`.
///
/// Pixels with weight 0 are copied from `base` unchanged and pixels with
/// weight 1 are copied from `overlay` unchanged; fractional weights (soft
/// masks) are blended and rounded half up.
pub fn composite_masked(
    base: &PixelBuffer,
    overlay: &PixelBuffer,
    mask: &RegionMask,
) -> Result<PixelBuffer> {
    base.ensure_same_dimensions(overlay)?;
    if mask.dimensions() != base.dimensions() {
        return Err(ProbeError::DimensionMismatch {
            expected: base.dimensions(),
            actual: mask.dimensions(),
        });
    }

    let data = base
        .as_bytes()
        .chunks_exact(CHANNELS)
        .zip(overlay.as_bytes().chunks_exact(CHANNELS))
        .zip(mask.weights())
        .flat_map(|((b, o), &w)| {
            let mut px = [0u8; CHANNELS];
            for c in 0..CHANNELS {
                px[c] = if w <= 0.0 {
                    b[c]
                } else if w >= 1.0 {
                    o[c]
                } else {
                    let w = w as f64;
                    round_half_up(w * o[c] as f64 + (1.0 - w) * b[c] as f64).clamp(0, 255) as u8
                };
            }
            px
        })
        .collect();

    PixelBuffer::new(base.width(), base.height(), data)
}

/// Blur the whole source at `sigma`, then paste the blurred pixels back only
/// inside `region`.
#[instrument(skip(source), fields(width = source.width(), height = source.height(), sigma))]
pub fn skin_smooth(source: &PixelBuffer, sigma: f32, region: &EllipseRegion) -> Result<PixelBuffer> {
    // Build the mask first so bad geometry fails before the expensive blur.
    let mask = RegionMask::ellipse(source.width(), source.height(), region)?;
    info!(covered = mask.covered_pixels(), "Smoothing masked region");

    let blurred = gaussian_blur(source, sigma)?;
    let out = composite_masked(source, &blurred, &mask)?;
    debug!("Masked blur composite complete");
    Ok(out)
}
