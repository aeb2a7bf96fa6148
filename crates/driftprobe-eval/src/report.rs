// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-text drift report: one row per submission, then every failed check.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::evaluator::Assessment;
use crate::suite::SuiteOutcome;

const LABEL_WIDTH: usize = 32;

/// Render suite outcomes as a fixed-width text table.
pub fn render(outcomes: &[SuiteOutcome], generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "driftprobe report  {}", generated_at.format("%Y-%m-%d %H:%M:%S UTC"));

    for outcome in outcomes {
        let _ = writeln!(out);
        let _ = writeln!(out, "== {} ==", outcome.suite);
        let _ = writeln!(
            out,
            "{:<LABEL_WIDTH$} {:<12} {:>7} {:>8}  FLAG",
            "VARIANT", "STATUS", "SCORE", "DELTA"
        );
        for assessment in &outcome.assessments {
            let _ = writeln!(out, "{}", row(assessment));
        }
    }

    let failures: Vec<String> = outcomes
        .iter()
        .flat_map(|o| {
            o.failed_checks().map(move |(a, c)| {
                format!(
                    "  [{}] {}: {}: {}",
                    o.suite,
                    a.label,
                    c.name,
                    c.reason().unwrap_or_default()
                )
            })
        })
        .collect();
    let total: usize = outcomes.iter().map(SuiteOutcome::check_count).sum();

    let _ = writeln!(out);
    if failures.is_empty() {
        let _ = writeln!(out, "All {total} checks passed.");
    } else {
        let _ = writeln!(out, "Failed checks ({} of {total}):", failures.len());
        for line in failures {
            let _ = writeln!(out, "{line}");
        }
    }
    out
}

/// One table row. Errors show as `ERROR` with blank numeric columns and the
/// error class in the flag column.
fn row(assessment: &Assessment) -> String {
    let label = truncate(&assessment.label, LABEL_WIDTH);
    let (status, score) = match (&assessment.result, &assessment.error) {
        (Some(result), _) => (
            result.status.clone(),
            result
                .score
                .map_or_else(|| "null".to_owned(), |s| format!("{s:.4}")),
        ),
        (None, Some(_)) => ("ERROR".to_owned(), "-".to_owned()),
        (None, None) => ("-".to_owned(), "-".to_owned()),
    };
    let delta = assessment
        .signed_delta()
        .map_or_else(|| "-".to_owned(), |d| format!("{d:+.4}"));
    let flag = match (assessment.flag, assessment.error_class) {
        (Some(flag), _) => flag.tag(),
        (None, Some(class)) => format!("<< {class} error"),
        (None, None) => String::new(),
    };

    format!("{label:<LABEL_WIDTH$} {status:<12} {score:>7} {delta:>8}  {flag}")
        .trim_end()
        .to_owned()
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_owned()
    } else {
        let kept: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{kept}~")
    }
}
