// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pixel module — raw RGB buffers, region masks, and blur.

pub mod blur;
pub mod buffer;
pub mod mask;

pub use blur::gaussian_blur;
pub use buffer::{CHANNELS, PixelBuffer, clamp_to_byte, round_half_up};
pub use mask::RegionMask;
