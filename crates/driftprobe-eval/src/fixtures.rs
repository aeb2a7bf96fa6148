// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image fixture table — each image the suites submit, with the verdict it is
// expected to receive and the baseline recorded for it.

use std::path::{Path, PathBuf};

use driftprobe_core::config::Thresholds;
use driftprobe_core::types::{Baseline, DetectionStatus, TransformKind, variant_file_name};
use serde::{Deserialize, Serialize};

/// Subdirectory of the data directory holding generated variants.
pub const VARIANTS_DIR: &str = "variants";

/// Inclusive score bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

impl ScoreRange {
    pub fn at_least(min: f64) -> Self {
        Self { min, max: 1.0 }
    }

    pub fn at_most(max: f64) -> Self {
        Self { min: 0.0, max }
    }

    pub fn contains(&self, score: f64) -> bool {
        (self.min..=self.max).contains(&score)
    }
}

impl std::fmt::Display for ScoreRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFixture {
    /// Short identifier, e.g. `fake_hflip`.
    pub label: String,
    pub path: PathBuf,
    pub description: String,
    /// Ground truth of the image this one was derived from.
    pub truth: DetectionStatus,
    pub expected_status: DetectionStatus,
    pub score_range: ScoreRange,
    /// Recorded reference verdict for this image.
    pub baseline: Baseline,
    /// Whether the observed score must stay within the drift tolerance of
    /// `baseline`.
    pub assert_stable: bool,
    /// Whether the per-model breakdown is validated (ensemble present, every
    /// model well-formed). Set for the originals only.
    pub check_models: bool,
    /// Transform that produced the image; `None` for the originals.
    pub transform: Option<TransformKind>,
}

/// The fixtures of one data directory.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureSet {
    fixtures: Vec<ImageFixture>,
}

impl FixtureSet {
    pub fn new(fixtures: Vec<ImageFixture>) -> Self {
        Self { fixtures }
    }

    /// The reference table: `fake.jpeg`, `real.jpg`, and the five standard
    /// variants under `variants/`.
    pub fn standard(data_dir: &Path, thresholds: &Thresholds) -> Self {
        let fake_path = data_dir.join("fake.jpeg");
        let real_path = data_dir.join("real.jpg");
        let variant = |stem: &str, kind| data_dir.join(VARIANTS_DIR).join(variant_file_name(stem, kind));

        let fake_baseline = Baseline::new(DetectionStatus::Manipulated, 0.95);
        let real_baseline = Baseline::new(DetectionStatus::Authentic, 0.18);
        let detected = ScoreRange::at_least(thresholds.fake_min_score);

        let evasion = |kind: TransformKind, description: &str| ImageFixture {
            label: format!("fake_{}", kind.name()),
            path: variant("fake", kind),
            description: description.to_owned(),
            truth: DetectionStatus::Manipulated,
            expected_status: DetectionStatus::Manipulated,
            score_range: detected,
            baseline: fake_baseline,
            assert_stable: true,
            check_models: false,
            transform: Some(kind),
        };

        Self::new(vec![
            ImageFixture {
                label: "fake".into(),
                path: fake_path,
                description: "Known manipulated image".into(),
                truth: DetectionStatus::Manipulated,
                expected_status: DetectionStatus::Manipulated,
                score_range: detected,
                baseline: fake_baseline,
                assert_stable: false,
                check_models: true,
                transform: None,
            },
            ImageFixture {
                label: "real".into(),
                path: real_path,
                description: "Known authentic image".into(),
                truth: DetectionStatus::Authentic,
                expected_status: DetectionStatus::Authentic,
                score_range: ScoreRange::at_most(thresholds.real_max_score),
                baseline: real_baseline,
                assert_stable: false,
                check_models: true,
                transform: None,
            },
            evasion(TransformKind::HorizontalFlip, "Fake, mirrored left-right"),
            evasion(
                TransformKind::Recompress,
                "Fake, recompressed at low then high JPEG quality",
            ),
            evasion(TransformKind::ResizeDownUp, "Fake, downscaled by half and back"),
            ImageFixture {
                label: "real_skin_smooth".into(),
                path: variant("real", TransformKind::SkinSmooth),
                description: "Real, face region blurred to remove skin texture".into(),
                truth: DetectionStatus::Authentic,
                expected_status: DetectionStatus::Suspicious,
                score_range: ScoreRange::at_least(thresholds.suspicious_threshold),
                baseline: Baseline::new(DetectionStatus::Suspicious, 0.54),
                assert_stable: false,
                check_models: false,
                transform: Some(TransformKind::SkinSmooth),
            },
            ImageFixture {
                label: "real_freq_inject".into(),
                path: variant("real", TransformKind::FreqInject),
                description: "Real, with a faint high-frequency residual of the fake".into(),
                truth: DetectionStatus::Authentic,
                expected_status: DetectionStatus::Authentic,
                score_range: ScoreRange::at_most(thresholds.real_max_score),
                baseline: Baseline::new(DetectionStatus::Authentic, 0.07),
                assert_stable: false,
                check_models: false,
                transform: Some(TransformKind::FreqInject),
            },
        ])
    }

    pub fn get(&self, label: &str) -> Option<&ImageFixture> {
        self.fixtures.iter().find(|f| f.label == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageFixture> {
        self.fixtures.iter()
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    /// Paths that do not exist on disk.
    pub fn missing(&self) -> Vec<&Path> {
        self.fixtures
            .iter()
            .map(|f| f.path.as_path())
            .filter(|p| !p.is_file())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> FixtureSet {
        FixtureSet::standard(Path::new("data"), &Thresholds::default())
    }

    #[test]
    fn standard_table_has_reference_rows() {
        let set = standard();
        assert_eq!(set.len(), 7);

        let fake = set.get("fake").expect("fake");
        assert_eq!(fake.path, Path::new("data/fake.jpeg"));
        assert_eq!(fake.baseline.score, 0.95);
        assert_eq!(fake.score_range.min, 0.85);

        let real = set.get("real").expect("real");
        assert_eq!(real.baseline, Baseline::new(DetectionStatus::Authentic, 0.18));
        assert_eq!(real.score_range.max, 0.3);
    }

    #[test]
    fn variant_paths_follow_generator_naming() {
        let set = standard();
        let hflip = set.get("fake_hflip").expect("hflip");
        assert_eq!(hflip.path, Path::new("data/variants/fake_hflip.jpg"));
        assert!(hflip.assert_stable);
        assert!(!hflip.check_models);
        assert!(set.get("fake").expect("fake").check_models);

        let smooth = set.get("real_skin_smooth").expect("skin_smooth");
        assert_eq!(smooth.path, Path::new("data/variants/real_skin_smooth.jpg"));
        assert_eq!(smooth.truth, DetectionStatus::Authentic);
        assert_eq!(smooth.expected_status, DetectionStatus::Suspicious);
        assert_eq!(smooth.score_range, ScoreRange::at_least(0.5));

        let inject = set.get("real_freq_inject").expect("freq_inject");
        assert_eq!(inject.expected_status, DetectionStatus::Authentic);
        assert_eq!(inject.baseline.score, 0.07);
    }

    #[test]
    fn ranges_follow_configured_thresholds() {
        let thresholds = Thresholds {
            fake_min_score: 0.7,
            ..Thresholds::default()
        };
        let set = FixtureSet::standard(Path::new("d"), &thresholds);
        assert_eq!(set.get("fake_resize_down_up").expect("row").score_range.min, 0.7);
    }

    #[test]
    fn missing_lists_absent_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("fake.jpeg"), b"x").expect("write");
        let set = FixtureSet::standard(dir.path(), &Thresholds::default());
        let missing = set.missing();
        assert_eq!(missing.len(), 6);
        assert!(!missing.contains(&dir.path().join("fake.jpeg").as_path()));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let range = ScoreRange::at_least(0.5);
        assert!(range.contains(0.5));
        assert!(range.contains(1.0));
        assert!(!range.contains(0.49));
    }
}
