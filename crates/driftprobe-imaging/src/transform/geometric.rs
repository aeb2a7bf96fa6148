// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometric transforms — mirror and resampling. Neither touches masks or
// residuals, and both preserve the source dimensions.

use driftprobe_core::error::{ProbeError, Result};
use image::imageops::{self, FilterType};
use tracing::{debug, instrument};

use crate::pixel::{CHANNELS, PixelBuffer};

/// Mirror the pixel grid left-right. No resampling; applying it twice
/// returns the original buffer.
#[instrument(skip(buffer), fields(width = buffer.width(), height = buffer.height()))]
pub fn flip_horizontal(buffer: &PixelBuffer) -> Result<PixelBuffer> {
    let row_len = buffer.width() as usize * CHANNELS;
    let mut data = Vec::with_capacity(buffer.as_bytes().len());
    for row in buffer.as_bytes().chunks_exact(row_len) {
        for pixel in row.chunks_exact(CHANNELS).rev() {
            data.extend_from_slice(pixel);
        }
    }
    PixelBuffer::new(buffer.width(), buffer.height(), data)
}

/// Resize to exactly `width` x `height` with bilinear (triangle) filtering.
pub fn resample(buffer: &PixelBuffer, width: u32, height: u32) -> Result<PixelBuffer> {
    if buffer.dimensions() == (width, height) {
        return Ok(buffer.clone());
    }
    let rgb = buffer.to_rgb_image()?;
    let resized = imageops::resize(&rgb, width, height, FilterType::Triangle);
    debug!(
        from_w = buffer.width(),
        from_h = buffer.height(),
        to_w = width,
        to_h = height,
        "Resampled"
    );
    PixelBuffer::from_rgb_image(resized)
}

/// Shrink to `fraction` of the original size, then scale back up, leaving
/// interpolation artifacts behind. Each reduced dimension is at least 1px.
#[instrument(skip(buffer), fields(width = buffer.width(), height = buffer.height()))]
pub fn resize_down_up(buffer: &PixelBuffer, fraction: f64) -> Result<PixelBuffer> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(ProbeError::InvalidParameter(format!(
            "resize fraction must be within (0, 1], got {fraction}"
        )));
    }
    let (width, height) = buffer.dimensions();
    let small_w = ((width as f64 * fraction).round() as u32).max(1);
    let small_h = ((height as f64 * fraction).round() as u32).max(1);

    let small = resample(buffer, small_w, small_h)?;
    resample(&small, width, height)
}
