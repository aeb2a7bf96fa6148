// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Region masks — per-pixel weights in [0, 1] that localise an effect.

use driftprobe_core::error::{ProbeError, Result};
use driftprobe_core::types::EllipseRegion;
use tracing::debug;

/// Per-pixel blend weights for a `width` x `height` image.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMask {
    width: u32,
    height: u32,
    weights: Vec<f32>,
}

impl RegionMask {
    /// Hard elliptical mask: weight 1.0 where
    /// `((x - cx*W) / (rx*W))^2 + ((y - cy*H) / (ry*H))^2 <= 1`, else 0.0.
    ///
    /// The ellipse is fixed geometry expressed as fractions of the image
    /// size; it never looks at image content.
    pub fn ellipse(width: u32, height: u32, region: &EllipseRegion) -> Result<Self> {
        validate_region(region)?;

        let (w, h) = (width as f64, height as f64);
        let (cx, cy) = (region.center_x * w, region.center_y * h);
        let (rx, ry) = (region.radius_x * w, region.radius_y * h);

        let mut weights = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            let dy = (y as f64 - cy) / ry;
            for x in 0..width {
                let dx = (x as f64 - cx) / rx;
                weights.push(if dx * dx + dy * dy <= 1.0 { 1.0 } else { 0.0 });
            }
        }

        let mask = Self {
            width,
            height,
            weights,
        };
        debug!(
            width,
            height,
            covered = mask.covered_pixels(),
            "Ellipse mask built"
        );
        Ok(mask)
    }

    /// A mask that selects nothing.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            weights: vec![0.0; width as usize * height as usize],
        }
    }

    /// Wrap explicit weights. Every weight must lie in [0, 1].
    #[cfg(test)]
    pub(crate) fn from_weights(width: u32, height: u32, weights: Vec<f32>) -> Result<Self> {
        if weights.len() != width as usize * height as usize {
            return Err(ProbeError::InvalidParameter(format!(
                "mask needs {} weights for {width}x{height}, got {}",
                width as usize * height as usize,
                weights.len()
            )));
        }
        if let Some(bad) = weights.iter().find(|w| !(0.0..=1.0).contains(*w)) {
            return Err(ProbeError::InvalidParameter(format!(
                "mask weight {bad} outside [0, 1]"
            )));
        }
        Ok(Self {
            width,
            height,
            weights,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Weight at (x, y). Panics if out of bounds.
    pub fn weight(&self, x: u32, y: u32) -> f32 {
        self.weights[y as usize * self.width as usize + x as usize]
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Number of pixels with non-zero weight.
    pub fn covered_pixels(&self) -> usize {
        self.weights.iter().filter(|&&w| w > 0.0).count()
    }
}

fn validate_region(region: &EllipseRegion) -> Result<()> {
    for (name, value) in [
        ("center_x", region.center_x),
        ("center_y", region.center_y),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ProbeError::InvalidParameter(format!(
                "ellipse {name} must be within [0, 1], got {value}"
            )));
        }
    }
    for (name, value) in [
        ("radius_x", region.radius_x),
        ("radius_y", region.radius_y),
    ] {
        // NaN fails the first comparison too.
        if !(value > 0.0 && value <= 1.0) {
            return Err(ProbeError::InvalidParameter(format!(
                "ellipse {name} must be within (0, 1], got {value}"
            )));
        }
    }
    Ok(())
}
