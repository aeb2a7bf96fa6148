// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JPEG codec boundary — decode source images into pixel buffers, encode
// buffers at a given quality, and write outputs with write-then-rename so a
// failed run never leaves a truncated file behind.

use std::io::Write;
use std::path::Path;

use driftprobe_core::error::{ProbeError, Result};
use image::codecs::jpeg::JpegEncoder;
use tracing::{debug, instrument};

use crate::pixel::PixelBuffer;

/// Decode encoded image bytes (JPEG, or anything else `image` understands)
/// into an RGB buffer. Alpha is discarded.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode(data: &[u8]) -> Result<PixelBuffer> {
    let image = image::load_from_memory(data)
        .map_err(|err| ProbeError::InvalidImage(format!("failed to decode image: {}", err)))?;
    debug!(
        width = image.width(),
        height = image.height(),
        "Image decoded from bytes"
    );
    PixelBuffer::from_dynamic(&image)
}

/// Read and decode an image file.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn open(path: impl AsRef<Path>) -> Result<PixelBuffer> {
    let image = image::open(path.as_ref()).map_err(|err| {
        ProbeError::InvalidImage(format!(
            "failed to open {}: {}",
            path.as_ref().display(),
            err
        ))
    })?;
    debug!(
        width = image.width(),
        height = image.height(),
        "Image loaded"
    );
    PixelBuffer::from_dynamic(&image)
}

/// Encode a buffer as baseline JPEG at `quality` (1-100).
pub fn encode_jpeg(buffer: &PixelBuffer, quality: u8) -> Result<Vec<u8>> {
    if !(1..=100).contains(&quality) {
        return Err(ProbeError::InvalidParameter(format!(
            "JPEG quality must be within 1..=100, got {quality}"
        )));
    }
    let rgb = buffer.to_rgb_image()?;
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|err| ProbeError::InvalidImage(format!("JPEG encoding failed: {}", err)))?;
    Ok(bytes)
}

/// Write `bytes` to `path` through a temporary file in the same directory,
/// renamed into place only once fully written.
#[instrument(skip(bytes), fields(path = %path.display(), len = bytes.len()))]
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| ProbeError::Io(err.error))?;
    debug!("Output written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> PixelBuffer {
        PixelBuffer::from_fn(32, 24, |x, y| [(x * 8) as u8, (y * 10) as u8, 128]).expect("buffer")
    }

    #[test]
    fn encode_then_decode_keeps_dimensions() {
        let bytes = encode_jpeg(&gradient(), 92).expect("encode");
        assert_eq!(&bytes[..2], &[0xFF, 0xD8], "JPEG SOI marker");
        let back = decode(&bytes).expect("decode");
        assert_eq!(back.dimensions(), (32, 24));
    }

    #[test]
    fn lower_quality_produces_fewer_bytes() {
        let noisy = PixelBuffer::from_fn(64, 64, |x, y| {
            let v = ((x * 7919 + y * 104_729) % 251) as u8;
            [v, v.wrapping_mul(3), v.wrapping_add(91)]
        })
        .expect("buffer");
        let high = encode_jpeg(&noisy, 95).expect("q95");
        let low = encode_jpeg(&noisy, 30).expect("q30");
        assert!(low.len() < high.len(), "q30 {} >= q95 {}", low.len(), high.len());
    }

    #[test]
    fn invalid_quality_is_rejected() {
        assert!(matches!(
            encode_jpeg(&gradient(), 0),
            Err(ProbeError::InvalidParameter(_))
        ));
        assert!(encode_jpeg(&gradient(), 101).is_err());
    }

    #[test]
    fn garbage_bytes_are_invalid_image() {
        assert!(matches!(
            decode(b"definitely not a jpeg"),
            Err(ProbeError::InvalidImage(_))
        ));
    }

    #[test]
    fn missing_file_is_invalid_image() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            open(dir.path().join("absent.jpg")),
            Err(ProbeError::InvalidImage(_))
        ));
    }

    #[test]
    fn write_atomic_creates_parent_and_replaces() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("variants").join("out.jpg");

        write_atomic(&path, b"first").expect("first write");
        write_atomic(&path, b"second").expect("second write");

        assert_eq!(std::fs::read(&path).expect("read"), b"second");
        let leftovers = std::fs::read_dir(path.parent().expect("parent"))
            .expect("read_dir")
            .count();
        assert_eq!(leftovers, 1, "temporary files must not be left behind");
    }
}
