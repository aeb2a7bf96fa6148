// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// driftprobe-imaging — Pixel-level machinery for adversarial variant generation.
//
// Provides an owned RGB pixel buffer, elliptical region masks, Gaussian blur,
// the five variant transforms (mirror, recompression, resize round trip,
// masked smoothing, frequency-residual injection), the JPEG codec boundary,
// and a generator that writes variants plus a manifest to disk.

pub mod codec;
pub mod generator;
pub mod pixel;
pub mod transform;

pub use generator::{
    VariantGenerator, VariantManifest, VariantOutput, VariantRequest, standard_requests,
};
pub use pixel::{PixelBuffer, RegionMask, gaussian_blur};
