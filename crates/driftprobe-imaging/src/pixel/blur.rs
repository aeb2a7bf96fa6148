// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Gaussian blur over pixel buffers. Used both as a cosmetic effect (large
// sigma) and as the low-pass half of high-frequency residual extraction
// (small sigma).

use driftprobe_core::error::{ProbeError, Result};
use imageproc::filter::gaussian_blur_f32;
use tracing::{debug, instrument};

use super::buffer::PixelBuffer;

/// Blur every channel with a separable Gaussian kernel of standard deviation
/// `sigma` pixels.
///
/// `sigma == 0` returns an exact copy. Negative or non-finite sigma fails
/// with `InvalidParameter`. Output dimensions always equal input dimensions.
#[instrument(skip(buffer), fields(width = buffer.width(), height = buffer.height()))]
pub fn gaussian_blur(buffer: &PixelBuffer, sigma: f32) -> Result<PixelBuffer> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(ProbeError::InvalidParameter(format!(
            "blur sigma must be a non-negative finite number, got {sigma}"
        )));
    }
    if sigma == 0.0 {
        return Ok(buffer.clone());
    }

    let rgb = buffer.to_rgb_image()?;
    let blurred = gaussian_blur_f32(&rgb, sigma);
    debug!(sigma, "Gaussian blur applied");
    PixelBuffer::from_rgb_image(blurred)
}
