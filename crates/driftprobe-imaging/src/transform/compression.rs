// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lossy recompression — the first leg of a laundering pipeline. The second,
// higher-quality encode is the generator's final output encode.

use driftprobe_core::error::Result;
use tracing::{debug, instrument};

use crate::codec;
use crate::pixel::PixelBuffer;

/// Encode at `low_quality` and decode again, baking JPEG block artifacts into
/// the pixels.
#[instrument(skip(buffer), fields(width = buffer.width(), height = buffer.height()))]
pub fn recompress(buffer: &PixelBuffer, low_quality: u8) -> Result<PixelBuffer> {
    let bytes = codec::encode_jpeg(buffer, low_quality)?;
    debug!(low_quality, encoded_len = bytes.len(), "Low-quality pass encoded");
    codec::decode(&bytes)
}
