// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The narrow submit/poll contract every detection backend implements.

use std::future::Future;
use std::time::Duration;

use driftprobe_core::config::PollingConfig;
use driftprobe_core::error::{ProbeError, Result};
use driftprobe_core::types::{DetectionResult, PollState};

/// A detection service, reduced to its two primitive calls.
///
/// Implementations own transport and authentication details. They are shared
/// behind an `Arc` and polled from spawned tasks, hence the `Send + Sync`
/// bounds and `Send` futures.
pub trait DetectorBackend: Send + Sync + 'static {
    /// Submit encoded image bytes. Returns the service's request id.
    fn upload(
        &self,
        credential: &str,
        image: Vec<u8>,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Ask for the current state of a previously submitted request.
    fn fetch(&self, request_id: &str) -> impl Future<Output = Result<PollState>> + Send;
}

/// Timing for the event-driven call shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Pause between polls.
    pub interval: Duration,
    /// Hard deadline for the whole subscription.
    pub timeout: Duration,
}

impl From<&PollingConfig> for PollOptions {
    fn from(polling: &PollingConfig) -> Self {
        Self {
            interval: polling.interval(),
            timeout: polling.timeout(),
        }
    }
}

/// What the background poller publishes. Exactly one event is sent per
/// subscription.
#[derive(Debug)]
pub enum PollEvent {
    Result(DetectionResult),
    Error(ProbeError),
}
