// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// driftprobe-eval — Judging classifier verdicts.
//
// `DriftEvaluator` turns a detection outcome plus a recorded baseline into a
// list of pass/fail checks, a drift measurement, and an optional flag. Suites
// run the reference fixture table through a `DetectionClient` and collect
// every check; the report module renders the outcome as text.

pub mod evaluator;
pub mod fixtures;
pub mod report;
pub mod suite;

pub use evaluator::{Assessment, Check, CheckStatus, DriftEvaluator, Flag};
pub use fixtures::{FixtureSet, ImageFixture, ScoreRange};
pub use suite::{Suite, SuiteOutcome, SuiteRunner};
