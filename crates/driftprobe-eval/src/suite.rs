// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Suites — groups of fixture submissions run through a `DetectionClient`.
//
// Submissions run one after another inside named steps. Every check is
// collected; a failing fixture never stops the rest of its suite.

use std::path::Path;

use driftprobe_core::error::{DetectorErrorCode, ProbeError, Result};
use driftprobe_core::types::DetectionResult;
use driftprobe_detect::{DetectionClient, DetectorBackend, PollOptions, step};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::evaluator::{Assessment, Check, DriftEvaluator};
use crate::fixtures::{FixtureSet, ImageFixture};

/// Path submitted by the edge suite; it must not exist.
const NONEXISTENT_IMAGE: &str = "non-existent.jpg";

/// Credential the edge suite presents to provoke `unauthorized`.
const INVALID_CREDENTIAL: &str = "driftprobe-invalid-key-edge";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suite {
    /// Originals through every call shape, with full shape validation.
    Detection,
    /// Laundering variants of the fake must stay detected and stable.
    Evasion,
    /// Edits of the real image: one should look suspicious, one should not.
    FalsePositive,
    /// Credential and local file failure paths.
    Edge,
}

impl Suite {
    pub const ALL: [Suite; 4] = [
        Self::Detection,
        Self::Evasion,
        Self::FalsePositive,
        Self::Edge,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Detection => "detection",
            Self::Evasion => "evasion",
            Self::FalsePositive => "false_positive",
            Self::Edge => "edge",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl std::fmt::Display for Suite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// All assessments produced by one suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteOutcome {
    pub suite: Suite,
    pub assessments: Vec<Assessment>,
}

impl SuiteOutcome {
    pub fn passed(&self) -> bool {
        self.assessments.iter().all(Assessment::passed)
    }

    pub fn check_count(&self) -> usize {
        self.assessments.iter().map(|a| a.checks.len()).sum()
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = (&Assessment, &Check)> {
        self.assessments
            .iter()
            .flat_map(|a| a.failures().map(move |c| (a, c)))
    }
}

/// Runs suites against one client and fixture set.
pub struct SuiteRunner<B> {
    client: DetectionClient<B>,
    evaluator: DriftEvaluator,
    fixtures: FixtureSet,
    poll_options: PollOptions,
}

impl<B: DetectorBackend> SuiteRunner<B> {
    pub fn new(client: DetectionClient<B>, evaluator: DriftEvaluator, fixtures: FixtureSet) -> Self {
        let poll_options = PollOptions::from(client.polling());
        Self {
            client,
            evaluator,
            fixtures,
            poll_options,
        }
    }

    pub fn fixtures(&self) -> &FixtureSet {
        &self.fixtures
    }

    #[instrument(skip(self), fields(suite = %suite))]
    pub async fn run(&self, suite: Suite) -> Result<SuiteOutcome> {
        let assessments = match suite {
            Suite::Detection => self.run_detection().await?,
            Suite::Evasion => {
                self.run_fixtures(&["fake_hflip", "fake_jpeg_recompress", "fake_resize_down_up"])
                    .await?
            }
            Suite::FalsePositive => {
                self.run_fixtures(&["real_skin_smooth", "real_freq_inject"])
                    .await?
            }
            Suite::Edge => self.run_edge().await?,
        };

        let outcome = SuiteOutcome {
            suite,
            assessments,
        };
        let failed = outcome.failed_checks().count();
        if failed == 0 {
            info!(checks = outcome.check_count(), "Suite passed");
        } else {
            warn!(checks = outcome.check_count(), failed, "Suite has failing checks");
        }
        Ok(outcome)
    }

    pub async fn run_all(&self) -> Result<Vec<SuiteOutcome>> {
        let mut outcomes = Vec::with_capacity(Suite::ALL.len());
        for suite in Suite::ALL {
            outcomes.push(self.run(suite).await?);
        }
        Ok(outcomes)
    }

    fn fixture(&self, label: &str) -> Result<&ImageFixture> {
        self.fixtures
            .get(label)
            .ok_or_else(|| ProbeError::Config(format!("fixture {label} is not defined")))
    }

    async fn run_detection(&self) -> Result<Vec<Assessment>> {
        let fake = self.fixture("fake")?;
        let real = self.fixture("real")?;
        let mut out = Vec::with_capacity(4);

        let label = "fake (detect_file)";
        let outcome = step(label, self.client.detect_file(&fake.path)).await;
        out.push(self.evaluator.assess_labelled(label, fake, outcome));

        let label = "real (detect_file)";
        let outcome = step(label, self.client.detect_file(&real.path)).await;
        out.push(self.evaluator.assess_labelled(label, real, outcome));

        let label = "fake (upload_and_get_result)";
        let outcome = step(label, self.client.upload_and_get_result(&fake.path)).await;
        out.push(self.evaluator.assess_labelled(label, fake, outcome));

        let label = "real (upload_and_poll_events)";
        let outcome = step(
            label,
            self.client.upload_and_poll_events(&real.path, self.poll_options),
        )
        .await;
        out.push(self.evaluator.assess_labelled(label, real, outcome));

        Ok(out)
    }

    async fn run_fixtures(&self, labels: &[&str]) -> Result<Vec<Assessment>> {
        let mut out = Vec::with_capacity(labels.len());
        for label in labels {
            let fixture = self.fixture(label)?;
            let outcome = step(label, self.client.detect_file(&fixture.path)).await;
            out.push(self.evaluator.assess(fixture, outcome));
        }
        Ok(out)
    }

    async fn run_edge(&self) -> Result<Vec<Assessment>> {
        let mut out = Vec::with_capacity(3);

        let label = "empty api key";
        let check = match self.client.with_credential("") {
            Err(err) => expect_code(DetectorErrorCode::Unauthorized, Err(err)),
            Ok(_) => Check::fail("unauthorized", "expected unauthorized, client was built"),
        };
        out.push(Assessment::from_checks(label, vec![check]));

        let label = "nonexistent path";
        let outcome = step(label, self.client.detect_file(Path::new(NONEXISTENT_IMAGE))).await;
        out.push(Assessment::from_checks(
            label,
            vec![expect_code(DetectorErrorCode::InvalidFile, outcome)],
        ));

        let label = "invalid api key";
        let fake = self.fixture("fake")?;
        let outcome = match self.client.with_credential(INVALID_CREDENTIAL) {
            Ok(client) => step(label, client.detect_file(&fake.path)).await,
            Err(err) => Err(err),
        };
        out.push(Assessment::from_checks(
            label,
            vec![expect_code(DetectorErrorCode::Unauthorized, outcome)],
        ));

        Ok(out)
    }
}

/// Pass iff `outcome` failed with `code`.
fn expect_code(code: DetectorErrorCode, outcome: Result<DetectionResult>) -> Check {
    let name = code.as_str();
    match outcome {
        Err(err) if err.detector_code() == Some(&code) => Check::pass(name),
        Err(err) => Check::fail(name, format!("expected {name}, got {err}")),
        Ok(result) => Check::fail(
            name,
            format!("expected {name}, got a result ({})", result.status),
        ),
    }
}
