// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transform module — the five adversarial edits and a dispatcher over
// `TransformSpec`.

pub mod composite;
pub mod compression;
pub mod geometric;
pub mod residual;

use driftprobe_core::error::{ProbeError, Result};
use driftprobe_core::types::TransformSpec;

use crate::pixel::PixelBuffer;

pub use composite::{composite_masked, skin_smooth};
pub use compression::recompress;
pub use geometric::{flip_horizontal, resample, resize_down_up};
pub use residual::{Residual, freq_inject, inject};

/// Apply `spec` to `source`. `fingerprint` is required by (and only read by)
/// frequency injection.
pub fn apply(
    spec: &TransformSpec,
    source: &PixelBuffer,
    fingerprint: Option<&PixelBuffer>,
) -> Result<PixelBuffer> {
    match *spec {
        TransformSpec::HorizontalFlip => flip_horizontal(source),
        TransformSpec::Recompress { low_quality, .. } => recompress(source, low_quality),
        TransformSpec::ResizeDownUp { fraction } => resize_down_up(source, fraction),
        TransformSpec::SkinSmooth { sigma, region, .. } => skin_smooth(source, sigma, &region),
        TransformSpec::FreqInject { sigma, weight } => {
            let fingerprint = fingerprint.ok_or_else(|| {
                ProbeError::InvalidParameter(
                    "freq_inject requires a fingerprint source image".into(),
                )
            })?;
            freq_inject(source, fingerprint, sigma, weight)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftprobe_core::config::TransformParams;
    use driftprobe_core::types::TransformKind;

    #[test]
    fn every_kind_preserves_dimensions() {
        let source = PixelBuffer::from_fn(30, 20, |x, y| [(x * 8) as u8, (y * 12) as u8, 64])
            .expect("source");
        let fingerprint = PixelBuffer::from_fn(45, 50, |x, y| [((x ^ y) * 5) as u8; 3])
            .expect("fingerprint");
        let params = TransformParams::default();

        for kind in TransformKind::ALL {
            let out = apply(&params.spec(kind), &source, Some(&fingerprint))
                .unwrap_or_else(|err| panic!("{kind} failed: {err}"));
            assert_eq!(out.dimensions(), (30, 20), "{kind} changed dimensions");
        }
    }

    #[test]
    fn freq_inject_without_fingerprint_fails() {
        let source = PixelBuffer::filled(4, 4, [10, 20, 30]).expect("source");
        let spec = TransformSpec::FreqInject {
            sigma: 2.0,
            weight: 0.15,
        };
        assert!(matches!(
            apply(&spec, &source, None),
            Err(ProbeError::InvalidParameter(_))
        ));
    }

    #[test]
    fn fingerprint_is_ignored_by_single_source_transforms() {
        let source = PixelBuffer::from_fn(6, 6, |x, _| [(x * 40) as u8, 0, 0]).expect("source");
        let other = PixelBuffer::filled(6, 6, [255, 255, 255]).expect("other");
        let with = apply(&TransformSpec::HorizontalFlip, &source, Some(&other)).expect("with");
        let without = apply(&TransformSpec::HorizontalFlip, &source, None).expect("without");
        assert_eq!(with, without);
    }
}
