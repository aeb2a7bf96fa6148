// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Step tracing — wrap an async call in a named span so every detector call in
// a suite shows up as a labelled step with its duration.

use std::future::Future;
use std::time::Instant;

use tracing::{Instrument, debug, info_span};

/// Run `fut` inside a `step` span labelled `label`.
pub async fn step<F, T>(label: &str, fut: F) -> T
where
    F: Future<Output = T>,
{
    let span = info_span!("step", label = %label);
    async move {
        let started = Instant::now();
        let out = fut.await;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "step finished");
        out
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn step_returns_inner_value() {
        let value = step("answer", async { 41 + 1 }).await;
        assert_eq!(value, 42);
    }
}
