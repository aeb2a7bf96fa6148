// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: classifier verdicts, baselines, drift results, and the
// transform descriptions that drive variant generation.

use serde::{Deserialize, Serialize};

/// Verdict statuses the detection service can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionStatus {
    Authentic,
    Manipulated,
    Suspicious,
    Unknown,
}

impl DetectionStatus {
    /// Every status the service is allowed to report.
    pub const ALL: [DetectionStatus; 4] = [
        Self::Authentic,
        Self::Manipulated,
        Self::Suspicious,
        Self::Unknown,
    ];

    /// Wire string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentic => "AUTHENTIC",
            Self::Manipulated => "MANIPULATED",
            Self::Suspicious => "SUSPICIOUS",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse a wire string. Returns `None` for anything outside the fixed set.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }
}

impl std::fmt::Display for DetectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-model breakdown entry of a detection result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub name: String,
    pub status: String,
    /// `None` when the model has not produced a numeric score.
    #[serde(default)]
    pub score: Option<f64>,
}

/// A detection result as reported by the service.
///
/// `status` is kept as the raw wire string so that shape validation can
/// report statuses outside the known set instead of failing to parse.
/// `score` is `None` while the result is not yet final.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub request_id: String,
    pub status: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub models: Vec<ModelResult>,
}

/// Interpretation of a result's status and score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// No final numeric score yet.
    Pending,
    /// Final score with a recognised status.
    Final { status: DetectionStatus, score: f64 },
}

impl DetectionResult {
    /// Parsed status, or `None` if the wire status is not a known status.
    pub fn parsed_status(&self) -> Option<DetectionStatus> {
        DetectionStatus::parse(&self.status)
    }

    /// Collapse status and score into a [`Verdict`].
    ///
    /// A result with a score but an unrecognised status is reported as
    /// `Final` with [`DetectionStatus::Unknown`].
    pub fn verdict(&self) -> Verdict {
        match self.score {
            None => Verdict::Pending,
            Some(score) => Verdict::Final {
                status: self.parsed_status().unwrap_or(DetectionStatus::Unknown),
                score,
            },
        }
    }

    /// Names of the models in the per-model breakdown, in order.
    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }
}

/// State of a submitted request when polled.
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    /// The service is still analysing the image.
    Processing,
    /// Analysis finished.
    Complete(DetectionResult),
}

/// A previously recorded verdict for an image, used as the drift reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub status: DetectionStatus,
    pub score: f64,
}

impl Baseline {
    pub fn new(status: DetectionStatus, score: f64) -> Self {
        Self { status, score }
    }
}

/// Outcome of comparing an observed score against a baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftResult {
    /// Which variant produced the observation.
    pub label: String,
    /// Absolute difference between observed and baseline score.
    pub delta: f64,
    pub within_tolerance: bool,
}

// -- Transforms ---------------------------------------------------------------

/// An ellipse expressed as fractions of image width and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EllipseRegion {
    pub center_x: f64,
    pub center_y: f64,
    pub radius_x: f64,
    pub radius_y: f64,
}

impl EllipseRegion {
    pub fn new(center_x: f64, center_y: f64, radius_x: f64, radius_y: f64) -> Self {
        Self {
            center_x,
            center_y,
            radius_x,
            radius_y,
        }
    }
}

/// Discriminant of [`TransformSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    HorizontalFlip,
    Recompress,
    ResizeDownUp,
    SkinSmooth,
    FreqInject,
}

impl TransformKind {
    pub const ALL: [TransformKind; 5] = [
        Self::HorizontalFlip,
        Self::Recompress,
        Self::ResizeDownUp,
        Self::SkinSmooth,
        Self::FreqInject,
    ];

    /// Short name used in file names, manifests, and the CLI.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HorizontalFlip => "hflip",
            Self::Recompress => "jpeg_recompress",
            Self::ResizeDownUp => "resize_down_up",
            Self::SkinSmooth => "skin_smooth",
            Self::FreqInject => "freq_inject",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// File name of the variant derived from `source_stem` by `kind`, e.g.
/// `fake_hflip.jpg`.
pub fn variant_file_name(source_stem: &str, kind: TransformKind) -> String {
    format!("{}_{}.jpg", source_stem, kind.name())
}

impl std::fmt::Display for TransformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One fully-parameterised image transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformSpec {
    /// Mirror the pixel grid left-right.
    HorizontalFlip,
    /// Encode at `low_quality`, decode, then encode the output at `high_quality`.
    Recompress { low_quality: u8, high_quality: u8 },
    /// Resize to `fraction` of the original size and back.
    ResizeDownUp { fraction: f64 },
    /// Blur the whole image at `sigma` and composite it back inside `region`,
    /// encoding at `quality`.
    SkinSmooth {
        sigma: f32,
        region: EllipseRegion,
        quality: u8,
    },
    /// Add `weight` times the high-frequency residual of a second image.
    FreqInject { sigma: f32, weight: f64 },
}

impl TransformSpec {
    pub fn kind(&self) -> TransformKind {
        match self {
            Self::HorizontalFlip => TransformKind::HorizontalFlip,
            Self::Recompress { .. } => TransformKind::Recompress,
            Self::ResizeDownUp { .. } => TransformKind::ResizeDownUp,
            Self::SkinSmooth { .. } => TransformKind::SkinSmooth,
            Self::FreqInject { .. } => TransformKind::FreqInject,
        }
    }

    /// Whether the transform needs a second (fingerprint) source image.
    pub fn needs_fingerprint(&self) -> bool {
        matches!(self, Self::FreqInject { .. })
    }

    /// JPEG quality of the final encode, falling back to `default_quality`
    /// for transforms that do not pin one.
    pub fn output_quality(&self, default_quality: u8) -> u8 {
        match self {
            Self::Recompress { high_quality, .. } => *high_quality,
            Self::SkinSmooth { quality, .. } => *quality,
            _ => default_quality,
        }
    }
}
