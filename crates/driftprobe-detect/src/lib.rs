// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// driftprobe-detect — Boundary to the remote image-authenticity service.
//
// The service itself is abstracted behind `DetectorBackend`. `DetectionClient`
// layers the three retrieval shapes (poll to completion, explicit upload then
// poll, event-driven polling with cancellation) on top of any backend and
// serializes submissions. `ReplayDetector` answers from a recorded table so
// suites can run offline.

pub mod backend;
pub mod cancel;
pub mod classify;
pub mod client;
pub mod replay;
pub mod step;

pub use backend::{DetectorBackend, PollEvent, PollOptions};
pub use cancel::CancelToken;
pub use classify::{ErrorClass, classify_error, is_retryable};
pub use client::DetectionClient;
pub use replay::ReplayDetector;
pub use step::step;
