// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pixel buffer — a decoded, fixed-size RGB image with primitive per-pixel and
// per-channel operations.

use driftprobe_core::error::{ProbeError, Result};
use image::{DynamicImage, RgbImage};

/// Number of interleaved channels in every buffer. Alpha is never kept.
pub const CHANNELS: usize = 3;

/// A decoded RGB image stored row-major with interleaved channels.
///
/// Operations never mutate a buffer in place; each one returns a freshly
/// allocated buffer, so independent variants can be rendered concurrently
/// without coordination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    // -- Construction ---------------------------------------------------------

    /// Wrap raw interleaved RGB bytes.
    ///
    /// Fails with `InvalidImage` when either dimension is zero or the byte
    /// count is not `width * height * 3`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ProbeError::InvalidImage(format!(
                "image dimensions must be positive, got {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(ProbeError::InvalidImage(format!(
                "expected {expected} bytes for {width}x{height} RGB, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A buffer where every pixel has the same colour.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self> {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * CHANNELS)
            .collect();
        Self::new(width, height, data)
    }

    /// Build a buffer by evaluating `f` at every pixel, row by row.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 3]) -> Result<Self> {
        let mut data = Vec::with_capacity(width as usize * height as usize * CHANNELS);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self::new(width, height, data)
    }

    /// Take ownership of an `image` RGB buffer.
    pub fn from_rgb_image(image: RgbImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }

    /// Convert any decoded image to RGB, dropping alpha.
    pub fn from_dynamic(image: &DynamicImage) -> Result<Self> {
        Self::from_rgb_image(image.to_rgb8())
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Raw interleaved bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Byte offset of the first channel of pixel (x, y).
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    /// Read one pixel. Panics if (x, y) lies outside the buffer.
    pub fn get(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Write one pixel. Panics if (x, y) lies outside the buffer.
    pub fn set(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let i = self.offset(x, y);
        self.data[i..i + CHANNELS].copy_from_slice(&rgb);
    }

    /// Copy into an `image` RGB buffer for codec and filter interop.
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            ProbeError::InvalidImage(format!(
                "buffer does not fit {}x{} RGB",
                self.width, self.height
            ))
        })
    }

    // -- Per-channel arithmetic -----------------------------------------------

    /// Fail with `DimensionMismatch` unless `other` has the same size.
    pub fn ensure_same_dimensions(&self, other: &PixelBuffer) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(ProbeError::DimensionMismatch {
                expected: self.dimensions(),
                actual: other.dimensions(),
            });
        }
        Ok(())
    }

    /// Signed per-sample difference `self - other` in a wide integer range.
    pub fn signed_difference(&self, other: &PixelBuffer) -> Result<Vec<i16>> {
        self.ensure_same_dimensions(other)?;
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| a as i16 - b as i16)
            .collect())
    }
}

/// Clamp a wide integer sample back into the byte range. Never wraps.
pub fn clamp_to_byte(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Round half up (towards positive infinity), so `-2.5` becomes `-2` and
/// `2.5` becomes `3`.
pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}
