// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Drift evaluator — compares classifier verdicts against baselines and
// validates result shape.
//
// Every check reports a structured pass/fail instead of returning early, so a
// suite can list all violations. A detector error is "no score to evaluate",
// never a drift breach.

use driftprobe_core::config::{ProbeConfig, Thresholds};
use driftprobe_core::error::ProbeError;
use driftprobe_core::types::{Baseline, DetectionResult, DetectionStatus, DriftResult, Verdict};
use driftprobe_detect::{ErrorClass, classify_error};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::fixtures::{ImageFixture, ScoreRange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Failed { reason: String },
}

/// One named assertion and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    pub name: String,
    pub status: CheckStatus,
}

impl Check {
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Passed,
        }
    }

    pub fn fail(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    fn from_condition(name: &str, ok: bool, reason: impl FnOnce() -> String) -> Self {
        if ok { Self::pass(name) } else { Self::fail(name, reason()) }
    }

    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Passed
    }

    pub fn reason(&self) -> Option<&str> {
        match &self.status {
            CheckStatus::Passed => None,
            CheckStatus::Failed { reason } => Some(reason),
        }
    }
}

/// Notable outcome of a verdict relative to the source image's ground truth.
///
/// `CrossedSuspicious` fires at `score >= suspicious_threshold`, the same
/// inclusive bound the false-positive suite's score range uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    /// A manipulated source was reported AUTHENTIC.
    Evaded,
    /// An authentic source was reported MANIPULATED.
    FalsePositive,
    /// An authentic source scored at or above the suspicious threshold.
    CrossedSuspicious { threshold: f64 },
}

impl Flag {
    /// Marker printed in the report.
    pub fn tag(&self) -> String {
        match self {
            Self::Evaded => "<< EVADED".to_owned(),
            Self::FalsePositive => "<< FALSE POSITIVE!".to_owned(),
            Self::CrossedSuspicious { threshold } => format!("<< score crossed {threshold}"),
        }
    }
}

/// Everything learned from one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub label: String,
    /// The verdict, if the detector produced one.
    pub result: Option<DetectionResult>,
    /// The detector error, if it did not.
    pub error: Option<String>,
    /// What kind of failure `error` is.
    pub error_class: Option<ErrorClass>,
    pub baseline: Option<Baseline>,
    pub drift: Option<DriftResult>,
    pub flag: Option<Flag>,
    pub checks: Vec<Check>,
}

impl Assessment {
    /// An assessment made only of checks, with no verdict attached.
    pub fn from_checks(label: impl Into<String>, checks: Vec<Check>) -> Self {
        Self {
            label: label.into(),
            result: None,
            error: None,
            error_class: None,
            baseline: None,
            drift: None,
            flag: None,
            checks,
        }
    }

    pub fn passed(&self) -> bool {
        self.checks.iter().all(Check::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter().filter(|c| !c.passed())
    }

    /// `observed - baseline`, when both exist.
    pub fn signed_delta(&self) -> Option<f64> {
        let score = self.result.as_ref()?.score?;
        Some(score - self.baseline?.score)
    }
}

/// Judges detection results against thresholds and baselines.
#[derive(Debug, Clone)]
pub struct DriftEvaluator {
    thresholds: Thresholds,
    ensemble_model: String,
    known_models: Vec<String>,
}

impl DriftEvaluator {
    pub fn new(thresholds: Thresholds, ensemble_model: impl Into<String>) -> Self {
        Self {
            thresholds,
            ensemble_model: ensemble_model.into(),
            known_models: Vec::new(),
        }
    }

    /// Model names expected in a breakdown. Others are logged, not failed.
    pub fn with_known_models(mut self, known_models: Vec<String>) -> Self {
        self.known_models = known_models;
        self
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(config.thresholds, config.ensemble_model.clone())
            .with_known_models(config.known_models.clone())
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    // -- Drift ------------------------------------------------------------------

    /// `|score - baseline|` and whether it is within `max_baseline_delta`.
    /// `None` when the result has no final score.
    pub fn drift(
        &self,
        label: &str,
        result: &DetectionResult,
        baseline: &Baseline,
    ) -> Option<DriftResult> {
        let Verdict::Final { score, .. } = result.verdict() else {
            return None;
        };
        let delta = (score - baseline.score).abs();
        Some(DriftResult {
            label: label.to_owned(),
            delta,
            within_tolerance: delta <= self.thresholds.max_baseline_delta,
        })
    }

    /// Fails on a missing score (not final) or on a breach (delta greater
    /// than the tolerance). The two failures carry different reasons.
    pub fn stable_score(&self, label: &str, result: &DetectionResult, baseline: &Baseline) -> Check {
        const NAME: &str = "stable_score";
        match self.drift(label, result, baseline) {
            None => Check::fail(NAME, "score not final: classifier returned no numeric score"),
            Some(drift) if drift.within_tolerance => Check::pass(NAME),
            Some(drift) => Check::fail(
                NAME,
                format!(
                    "drift {:.4} from baseline {} exceeds {}",
                    drift.delta, baseline.score, self.thresholds.max_baseline_delta
                ),
            ),
        }
    }

    // -- Shape and expectation checks -------------------------------------------

    pub fn expect_status(&self, result: &DetectionResult, expected: DetectionStatus) -> Check {
        Check::from_condition("status", result.status == expected.as_str(), || {
            format!("expected {expected}, got {}", result.status)
        })
    }

    /// A null score always fails.
    pub fn expect_score_in_range(&self, result: &DetectionResult, range: &ScoreRange) -> Check {
        const NAME: &str = "score_in_range";
        match result.score {
            None => Check::fail(NAME, format!("expected score in {range}, got null")),
            Some(score) => Check::from_condition(NAME, range.contains(score), || {
                format!("expected score in {range}, got {score}")
            }),
        }
    }

    /// Score, when present, lies in [0, 1].
    pub fn score_shape(&self, result: &DetectionResult) -> Check {
        Check::from_condition(
            "score_shape",
            result.score.is_none_or(unit_interval),
            || format!("score {:?} outside [0, 1]", result.score),
        )
    }

    pub fn status_valid(&self, result: &DetectionResult) -> Check {
        Check::from_condition("status_valid", result.parsed_status().is_some(), || {
            format!("unknown status {:?}", result.status)
        })
    }

    pub fn request_id_present(&self, result: &DetectionResult) -> Check {
        Check::from_condition("request_id", !result.request_id.is_empty(), || {
            "empty request id".to_owned()
        })
    }

    /// At least one model and the ensemble model among them.
    pub fn ensemble_present(&self, result: &DetectionResult) -> Check {
        const NAME: &str = "ensemble_model";
        if result.models.is_empty() {
            return Check::fail(NAME, "no models in result");
        }
        Check::from_condition(
            NAME,
            result.models.iter().any(|m| m.name == self.ensemble_model),
            || format!("{} missing from {:?}", self.ensemble_model, result.model_names()),
        )
    }

    /// At least one model; every name non-empty; every present score in [0, 1].
    pub fn models_valid(&self, result: &DetectionResult) -> Check {
        const NAME: &str = "models_valid";
        if result.models.is_empty() {
            return Check::fail(NAME, "no models in result");
        }
        let problems: Vec<String> = result
            .models
            .iter()
            .enumerate()
            .filter_map(|(i, m)| {
                if m.name.is_empty() {
                    Some(format!("model #{i} has an empty name"))
                } else if !m.score.is_none_or(unit_interval) {
                    Some(format!("model {} score {:?} outside [0, 1]", m.name, m.score))
                } else {
                    None
                }
            })
            .collect();
        if !self.known_models.is_empty() {
            for name in result.model_names() {
                if !name.is_empty() && !self.known_models.iter().any(|k| k == name) {
                    warn!(model = name, "Model not in the known model list");
                }
            }
        }
        if problems.is_empty() {
            Check::pass(NAME)
        } else {
            Check::fail(NAME, problems.join("; "))
        }
    }

    // -- Flags --------------------------------------------------------------------

    /// Flag a verdict relative to the source image's ground truth.
    pub fn flag(&self, truth: DetectionStatus, result: &DetectionResult) -> Option<Flag> {
        let status = result.parsed_status();
        match truth {
            DetectionStatus::Manipulated if status == Some(DetectionStatus::Authentic) => {
                Some(Flag::Evaded)
            }
            DetectionStatus::Authentic if status == Some(DetectionStatus::Manipulated) => {
                Some(Flag::FalsePositive)
            }
            DetectionStatus::Authentic
                if result
                    .score
                    .is_some_and(|s| s >= self.thresholds.suspicious_threshold) =>
            {
                Some(Flag::CrossedSuspicious {
                    threshold: self.thresholds.suspicious_threshold,
                })
            }
            _ => None,
        }
    }

    // -- Whole-fixture assessment -------------------------------------------------

    /// Run every check that applies to `fixture` against a detection outcome.
    pub fn assess(
        &self,
        fixture: &ImageFixture,
        outcome: Result<DetectionResult, ProbeError>,
    ) -> Assessment {
        self.assess_labelled(&fixture.label, fixture, outcome)
    }

    /// Like [`DriftEvaluator::assess`], reporting under `label`.
    pub fn assess_labelled(
        &self,
        label: &str,
        fixture: &ImageFixture,
        outcome: Result<DetectionResult, ProbeError>,
    ) -> Assessment {
        let result = match outcome {
            Ok(result) => result,
            Err(err) => {
                let class = classify_error(&err);
                debug!(label, error = %err, class = %class, "No score to evaluate");
                let mut assessment = Assessment::from_checks(
                    label,
                    vec![Check::fail(
                        "detection",
                        format!("no score to evaluate ({class} error): {err}"),
                    )],
                );
                assessment.error = Some(err.to_string());
                assessment.error_class = Some(class);
                assessment.baseline = Some(fixture.baseline);
                return assessment;
            }
        };

        let mut checks = vec![
            self.request_id_present(&result),
            self.status_valid(&result),
            self.score_shape(&result),
        ];
        if fixture.check_models {
            checks.push(self.models_valid(&result));
            checks.push(self.ensemble_present(&result));
        }
        checks.push(self.expect_status(&result, fixture.expected_status));
        checks.push(self.expect_score_in_range(&result, &fixture.score_range));
        if fixture.assert_stable {
            checks.push(self.stable_score(label, &result, &fixture.baseline));
        }

        let drift = self.drift(label, &result, &fixture.baseline);
        let flag = self.flag(fixture.truth, &result);
        debug!(
            label,
            status = %result.status,
            score = ?result.score,
            flag = ?flag,
            "Assessed"
        );

        Assessment {
            label: label.to_owned(),
            result: Some(result),
            error: None,
            error_class: None,
            baseline: Some(fixture.baseline),
            drift,
            flag,
            checks,
        }
    }
}

fn unit_interval(score: f64) -> bool {
    (0.0..=1.0).contains(&score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FixtureSet;
    use driftprobe_core::error::DetectorErrorCode;
    use driftprobe_core::types::ModelResult;
    use std::path::Path;

    fn evaluator() -> DriftEvaluator {
        DriftEvaluator::from_config(&ProbeConfig::default())
    }

    fn result(status: &str, score: Option<f64>) -> DetectionResult {
        DetectionResult {
            request_id: "req-42".into(),
            status: status.into(),
            score,
            models: vec![
                ModelResult {
                    name: "rd-img-ensemble".into(),
                    status: status.into(),
                    score,
                },
                ModelResult {
                    name: "rd-oak-img".into(),
                    status: status.into(),
                    score: None,
                },
            ],
        }
    }

    fn fixtures() -> FixtureSet {
        FixtureSet::standard(Path::new("data"), &Thresholds::default())
    }

    #[test]
    fn drift_breach_is_strictly_greater_than_tolerance() {
        let eval = evaluator();
        let baseline = Baseline::new(DetectionStatus::Manipulated, 0.95);

        let breach = eval
            .drift("fake_hflip", &result("MANIPULATED", Some(0.89)), &baseline)
            .expect("drift");
        assert!((breach.delta - 0.06).abs() < 1e-9);
        assert!(!breach.within_tolerance);

        let edge = eval
            .drift("fake_hflip", &result("MANIPULATED", Some(0.925)), &baseline)
            .expect("drift");
        assert!(edge.within_tolerance, "delta 0.025 is inside tolerance");
    }

    #[test]
    fn null_score_is_not_final_rather_than_breach() {
        let eval = evaluator();
        let baseline = Baseline::new(DetectionStatus::Manipulated, 0.95);
        let check = eval.stable_score("fake", &result("MANIPULATED", None), &baseline);
        assert!(!check.passed());
        assert!(check.reason().expect("reason").contains("not final"));

        let breach = eval.stable_score("fake", &result("MANIPULATED", Some(0.5)), &baseline);
        assert!(breach.reason().expect("reason").contains("exceeds"));
    }

    #[test]
    fn score_range_fails_on_null() {
        let check = evaluator().expect_score_in_range(&result("AUTHENTIC", None), &ScoreRange::at_most(0.3));
        assert!(!check.passed());
    }

    #[test]
    fn shape_checks_catch_out_of_range_and_unknown_status() {
        let eval = evaluator();
        let bad = result("FAKE", Some(1.2));
        assert!(!eval.score_shape(&bad).passed());
        assert!(!eval.status_valid(&bad).passed());
        assert!(eval.score_shape(&result("UNKNOWN", None)).passed());
        assert!(eval.status_valid(&result("UNKNOWN", None)).passed());
    }

    #[test]
    fn model_checks() {
        let eval = evaluator();
        let good = result("AUTHENTIC", Some(0.1));
        assert!(eval.models_valid(&good).passed());
        assert!(eval.ensemble_present(&good).passed());

        let mut no_ensemble = good.clone();
        no_ensemble.models.remove(0);
        assert!(!eval.ensemble_present(&no_ensemble).passed());

        let mut unnamed = good.clone();
        unnamed.models[1].name.clear();
        assert!(!eval.models_valid(&unnamed).passed());

        let mut wild = good.clone();
        wild.models[1].score = Some(-0.2);
        assert!(!eval.models_valid(&wild).passed());

        let mut empty = good;
        empty.models.clear();
        assert!(!eval.models_valid(&empty).passed());
        assert!(!eval.ensemble_present(&empty).passed());
    }

    #[test]
    fn flags_follow_ground_truth() {
        let eval = evaluator();
        assert_eq!(
            eval.flag(DetectionStatus::Manipulated, &result("AUTHENTIC", Some(0.2))),
            Some(Flag::Evaded)
        );
        assert_eq!(
            eval.flag(DetectionStatus::Authentic, &result("MANIPULATED", Some(0.9))),
            Some(Flag::FalsePositive)
        );
        assert_eq!(
            eval.flag(DetectionStatus::Authentic, &result("SUSPICIOUS", Some(0.5))),
            Some(Flag::CrossedSuspicious { threshold: 0.5 })
        );
        assert_eq!(eval.flag(DetectionStatus::Authentic, &result("AUTHENTIC", Some(0.18))), None);
        assert_eq!(eval.flag(DetectionStatus::Manipulated, &result("MANIPULATED", Some(0.95))), None);
    }

    #[test]
    fn flag_tags() {
        assert_eq!(Flag::Evaded.tag(), "<< EVADED");
        assert_eq!(Flag::FalsePositive.tag(), "<< FALSE POSITIVE!");
        assert_eq!(Flag::CrossedSuspicious { threshold: 0.5 }.tag(), "<< score crossed 0.5");
    }

    #[test]
    fn skin_smooth_crosses_suspicious_without_breach() {
        let eval = evaluator();
        let set = fixtures();
        let fixture = set.get("real_skin_smooth").expect("fixture");
        let assessment = eval.assess(fixture, Ok(result("SUSPICIOUS", Some(0.54))));

        assert!(assessment.passed(), "failures: {:?}", assessment.failures().collect::<Vec<_>>());
        assert_eq!(assessment.flag, Some(Flag::CrossedSuspicious { threshold: 0.5 }));
        assert!(assessment.drift.as_ref().expect("drift").within_tolerance);
        assert!(assessment.checks.iter().all(|c| c.name != "stable_score"));
    }

    #[test]
    fn freq_inject_stays_authentic_and_low() {
        let eval = evaluator();
        let set = fixtures();
        let fixture = set.get("real_freq_inject").expect("fixture");
        let assessment = eval.assess(fixture, Ok(result("AUTHENTIC", Some(0.07))));
        assert!(assessment.passed());
        assert_eq!(assessment.flag, None);
        let delta = assessment.signed_delta().expect("delta");
        assert!(delta.abs() < 1e-9);
    }

    #[test]
    fn evasion_variant_with_drift_fails_stability() {
        let eval = evaluator();
        let set = fixtures();
        let fixture = set.get("fake_jpeg_recompress").expect("fixture");
        let assessment = eval.assess(fixture, Ok(result("MANIPULATED", Some(0.89))));
        let failed: Vec<&str> = assessment.failures().map(|c| c.name.as_str()).collect();
        assert_eq!(failed, ["stable_score"]);
        let delta = assessment.signed_delta().expect("delta");
        assert!((delta + 0.06).abs() < 1e-9);
    }

    #[test]
    fn detector_error_is_no_score_not_breach() {
        let eval = evaluator();
        let set = fixtures();
        let fixture = set.get("fake_hflip").expect("fixture");
        let err = ProbeError::detector(DetectorErrorCode::Timeout, "gave up");
        let assessment = eval.assess(fixture, Err(err));

        assert!(!assessment.passed());
        assert!(assessment.drift.is_none());
        assert_eq!(assessment.checks.len(), 1);
        assert!(assessment.checks[0].reason().expect("reason").starts_with("no score to evaluate"));
        assert!(assessment.error.as_deref().expect("error").contains("timeout"));
        assert_eq!(assessment.error_class, Some(ErrorClass::Transient));
        assert!(assessment.checks[0].reason().expect("reason").contains("transient"));
    }

    #[test]
    fn variants_skip_model_breakdown_checks() {
        let eval = evaluator();
        let set = fixtures();
        let mut bare = result("MANIPULATED", Some(0.95));
        bare.models.clear();

        let hflip = eval.assess(set.get("fake_hflip").expect("fixture"), Ok(bare.clone()));
        assert!(hflip.passed(), "failures: {:?}", hflip.failures().collect::<Vec<_>>());
        assert!(hflip.checks.iter().all(|c| c.name != "ensemble_model"));

        let fake = eval.assess(set.get("fake").expect("fixture"), Ok(bare));
        let failed: Vec<&str> = fake.failures().map(|c| c.name.as_str()).collect();
        assert_eq!(failed, ["models_valid", "ensemble_model"]);
    }

    #[test]
    fn unknown_model_names_do_not_fail() {
        let eval = evaluator();
        let mut extra = result("AUTHENTIC", Some(0.1));
        extra.models.push(ModelResult {
            name: "rd-new-img".into(),
            status: "AUTHENTIC".into(),
            score: Some(0.1),
        });
        assert!(eval.models_valid(&extra).passed());
    }
}
