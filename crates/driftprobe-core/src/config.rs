// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Probe configuration. Built once, then passed by reference to every
// component that needs thresholds or transform parameters.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, Result};
use crate::types::{EllipseRegion, TransformKind, TransformSpec};

/// Name of the aggregate model expected in every per-model breakdown.
pub const ENSEMBLE_MODEL: &str = "rd-img-ensemble";

/// Score thresholds used by the drift evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Minimum score for a known fake to count as detected.
    pub fake_min_score: f64,
    /// Maximum score for a known real image to count as authentic.
    pub real_max_score: f64,
    /// Score at which an authentic image is considered to have crossed into
    /// suspicious territory.
    pub suspicious_threshold: f64,
    /// Largest allowed absolute drift from a recorded baseline.
    pub max_baseline_delta: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            fake_min_score: 0.85,
            real_max_score: 0.3,
            suspicious_threshold: 0.5,
            max_baseline_delta: 0.05,
        }
    }
}

/// Polling budget for the detector boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 3_000,
            timeout_ms: 90_000,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Number of polls that fit in the timeout, rounded up.
    pub fn max_attempts(&self) -> u32 {
        if self.interval_ms == 0 {
            return 1;
        }
        self.timeout_ms.div_ceil(self.interval_ms).max(1) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinSmoothParams {
    pub sigma: f32,
    pub region: EllipseRegion,
    pub quality: u8,
}

impl Default for SkinSmoothParams {
    fn default() -> Self {
        Self {
            sigma: 4.0,
            region: EllipseRegion::new(0.5, 0.42, 0.34, 0.40),
            quality: 92,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreqInjectParams {
    pub sigma: f32,
    pub weight: f64,
}

impl Default for FreqInjectParams {
    fn default() -> Self {
        Self {
            sigma: 2.0,
            weight: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecompressParams {
    pub low_quality: u8,
    pub high_quality: u8,
}

impl Default for RecompressParams {
    fn default() -> Self {
        Self {
            low_quality: 55,
            high_quality: 85,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeParams {
    pub fraction: f64,
}

impl Default for ResizeParams {
    fn default() -> Self {
        Self { fraction: 0.5 }
    }
}

/// Parameters for each of the five transforms.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformParams {
    pub skin_smooth: SkinSmoothParams,
    pub freq_inject: FreqInjectParams,
    pub recompress: RecompressParams,
    pub resize_down_up: ResizeParams,
}

impl TransformParams {
    /// Build the fully-parameterised spec for `kind`.
    pub fn spec(&self, kind: TransformKind) -> TransformSpec {
        match kind {
            TransformKind::HorizontalFlip => TransformSpec::HorizontalFlip,
            TransformKind::Recompress => TransformSpec::Recompress {
                low_quality: self.recompress.low_quality,
                high_quality: self.recompress.high_quality,
            },
            TransformKind::ResizeDownUp => TransformSpec::ResizeDownUp {
                fraction: self.resize_down_up.fraction,
            },
            TransformKind::SkinSmooth => TransformSpec::SkinSmooth {
                sigma: self.skin_smooth.sigma,
                region: self.skin_smooth.region,
                quality: self.skin_smooth.quality,
            },
            TransformKind::FreqInject => TransformSpec::FreqInject {
                sigma: self.freq_inject.sigma,
                weight: self.freq_inject.weight,
            },
        }
    }
}

/// Complete harness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub thresholds: Thresholds,
    pub polling: PollingConfig,
    pub transforms: TransformParams,
    /// JPEG quality for variants that do not pin their own.
    pub output_quality: u8,
    /// Aggregate model that must appear in every result's model list.
    pub ensemble_model: String,
    /// Models the service is known to report.
    pub known_models: Vec<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            polling: PollingConfig::default(),
            transforms: TransformParams::default(),
            output_quality: 92,
            ensemble_model: ENSEMBLE_MODEL.to_owned(),
            known_models: [
                ENSEMBLE_MODEL,
                "rd-pine-img",
                "rd-full-pine-img",
                "rd-full-elm-img",
                "rd-elm-img",
                "rd-context-img",
                "rd-full-cedar-img",
                "rd-cedar-img",
                "rd-oak-img",
                "rd-full-oak-img",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl ProbeConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|err| {
            ProbeError::Config(format!("failed to read {}: {}", path.as_ref().display(), err))
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no component can work with.
    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        for (name, value) in [
            ("fake_min_score", t.fake_min_score),
            ("real_max_score", t.real_max_score),
            ("suspicious_threshold", t.suspicious_threshold),
            ("max_baseline_delta", t.max_baseline_delta),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ProbeError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        if self.polling.interval_ms == 0 {
            return Err(ProbeError::Config("polling interval must be non-zero".into()));
        }

        let p = &self.transforms;
        for (name, quality) in [
            ("output_quality", self.output_quality),
            ("skin_smooth.quality", p.skin_smooth.quality),
            ("recompress.low_quality", p.recompress.low_quality),
            ("recompress.high_quality", p.recompress.high_quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(ProbeError::Config(format!(
                    "{name} must be within 1..=100, got {quality}"
                )));
            }
        }

        if !(p.resize_down_up.fraction > 0.0 && p.resize_down_up.fraction <= 1.0) {
            return Err(ProbeError::Config(format!(
                "resize_down_up.fraction must be within (0, 1], got {}",
                p.resize_down_up.fraction
            )));
        }

        if self.ensemble_model.is_empty() {
            return Err(ProbeError::Config("ensemble_model must not be empty".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_values() {
        let config = ProbeConfig::default();
        assert_eq!(config.thresholds.fake_min_score, 0.85);
        assert_eq!(config.thresholds.real_max_score, 0.3);
        assert_eq!(config.thresholds.suspicious_threshold, 0.5);
        assert_eq!(config.thresholds.max_baseline_delta, 0.05);
        assert_eq!(config.output_quality, 92);
        assert_eq!(config.known_models.len(), 10);
        assert!(config.known_models.contains(&config.ensemble_model));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn max_attempts_rounds_up() {
        let polling = PollingConfig::default();
        assert_eq!(polling.max_attempts(), 30);
        let odd = PollingConfig {
            interval_ms: 4_000,
            timeout_ms: 90_000,
        };
        assert_eq!(odd.max_attempts(), 23);
    }

    #[test]
    fn spec_uses_configured_parameters() {
        let params = TransformParams::default();
        match params.spec(TransformKind::SkinSmooth) {
            TransformSpec::SkinSmooth {
                sigma,
                region,
                quality,
            } => {
                assert_eq!(sigma, 4.0);
                assert_eq!(region, EllipseRegion::new(0.5, 0.42, 0.34, 0.40));
                assert_eq!(quality, 92);
            }
            other => panic!("unexpected spec {other:?}"),
        }
        assert_eq!(
            params.spec(TransformKind::FreqInject),
            TransformSpec::FreqInject {
                sigma: 2.0,
                weight: 0.15
            }
        );
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{"thresholds": {{"max_baseline_delta": 0.1}}, "output_quality": 80}}"#
        )
        .expect("write");

        let config = ProbeConfig::load(file.path()).expect("load");
        assert_eq!(config.thresholds.max_baseline_delta, 0.1);
        assert_eq!(config.thresholds.fake_min_score, 0.85);
        assert_eq!(config.output_quality, 80);
        assert_eq!(config.transforms.freq_inject.weight, 0.15);
    }

    #[test]
    fn validate_rejects_bad_quality() {
        let mut config = ProbeConfig::default();
        config.transforms.recompress.low_quality = 0;
        assert!(matches!(config.validate(), Err(ProbeError::Config(_))));
    }

    #[test]
    fn validate_rejects_zero_fraction() {
        let mut config = ProbeConfig::default();
        config.transforms.resize_down_up.fraction = 0.0;
        assert!(matches!(config.validate(), Err(ProbeError::Config(_))));
    }
}
