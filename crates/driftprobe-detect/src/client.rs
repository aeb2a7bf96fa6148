// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Detection client — three call shapes over one `DetectorBackend`:
//
//   * `detect_file`              upload, then poll to completion
//   * `upload` + `get_result`    explicit two-phase submit-then-poll
//   * `upload_and_poll_events`   background poller on a channel, cancelled on
//                                the first event or by a hard timeout
//
// Submissions share the client's gate (an async mutex), so at most one image
// is in flight per client and its clones, whatever the caller's parallelism.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use driftprobe_core::config::PollingConfig;
use driftprobe_core::error::{DetectorErrorCode, ProbeError, Result};
use driftprobe_core::types::{DetectionResult, PollState};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, instrument, warn};

use crate::backend::{DetectorBackend, PollEvent, PollOptions};
use crate::cancel::CancelToken;
use crate::classify::is_retryable;

/// Client for a detection service.
pub struct DetectionClient<B> {
    backend: Arc<B>,
    credential: Arc<str>,
    polling: PollingConfig,
    gate: Arc<Mutex<()>>,
}

impl<B> Clone for DetectionClient<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            credential: Arc::clone(&self.credential),
            polling: self.polling,
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<B: DetectorBackend> DetectionClient<B> {
    /// Build a client. An empty credential fails here, before any call.
    pub fn new(backend: B, credential: &str, polling: PollingConfig) -> Result<Self> {
        if credential.trim().is_empty() {
            return Err(ProbeError::detector(
                DetectorErrorCode::Unauthorized,
                "an API key is required",
            ));
        }
        if polling.interval_ms == 0 {
            return Err(ProbeError::Config("polling interval must be non-zero".into()));
        }
        Ok(Self {
            backend: Arc::new(backend),
            credential: Arc::from(credential),
            polling,
            gate: Arc::new(Mutex::new(())),
        })
    }

    /// A client on the same backend and submission gate that presents
    /// `credential` instead. An empty credential fails as in [`Self::new`].
    pub fn with_credential(&self, credential: &str) -> Result<Self> {
        if credential.trim().is_empty() {
            return Err(ProbeError::detector(
                DetectorErrorCode::Unauthorized,
                "an API key is required",
            ));
        }
        Ok(Self {
            backend: Arc::clone(&self.backend),
            credential: Arc::from(credential),
            polling: self.polling,
            gate: Arc::clone(&self.gate),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn polling(&self) -> &PollingConfig {
        &self.polling
    }

    // -- Call shape 1: poll to completion -------------------------------------

    /// Submit the file at `path` and wait for its final result.
    ///
    /// The file is checked locally first; a missing, unreadable, or empty
    /// file fails with `invalid_file` without contacting the backend.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn detect_file(&self, path: &Path) -> Result<DetectionResult> {
        let image = read_image(path).await?;
        let _permit = self.gate.lock().await;
        let request_id = self.submit(image).await?;
        self.poll_to_completion(&request_id).await
    }

    // -- Call shape 2: explicit upload, then poll -----------------------------

    /// Submit the file and return the request id without waiting.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn upload(&self, path: &Path) -> Result<String> {
        let image = read_image(path).await?;
        let _permit = self.gate.lock().await;
        self.submit(image).await
    }

    /// Poll an uploaded request until it completes or the budget runs out.
    #[instrument(skip(self))]
    pub async fn get_result(&self, request_id: &str) -> Result<DetectionResult> {
        let _permit = self.gate.lock().await;
        self.poll_to_completion(request_id).await
    }

    /// `upload` then `get_result`, holding the gate across both.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn upload_and_get_result(&self, path: &Path) -> Result<DetectionResult> {
        let image = read_image(path).await?;
        let _permit = self.gate.lock().await;
        let request_id = self.submit(image).await?;
        self.poll_to_completion(&request_id).await
    }

    // -- Call shape 3: event-driven polling -----------------------------------

    /// Upload, then subscribe to a background poller.
    ///
    /// The subscription ends on the first published event (result or error),
    /// which cancels the poller. If nothing arrives within
    /// `options.timeout` the poller is cancelled and the call fails with
    /// `timeout`.
    #[instrument(skip(self, options), fields(path = %path.display(), timeout_ms = options.timeout.as_millis() as u64))]
    pub async fn upload_and_poll_events(
        &self,
        path: &Path,
        options: PollOptions,
    ) -> Result<DetectionResult> {
        let image = read_image(path).await?;
        let _permit = self.gate.lock().await;
        let request_id = self.submit(image).await?;

        let token = CancelToken::new();
        let (tx, mut rx) = mpsc::channel(1);
        let poller = tokio::spawn(poll_events(
            Arc::clone(&self.backend),
            request_id.clone(),
            options.interval,
            token.clone(),
            tx,
        ));

        let outcome = tokio::time::timeout(options.timeout, rx.recv()).await;
        token.cancel();
        if let Err(err) = poller.await {
            warn!(error = %err, "Poller task did not shut down cleanly");
        }

        match outcome {
            Ok(Some(PollEvent::Result(result))) => {
                info!(%request_id, status = %result.status, "Result received");
                Ok(result)
            }
            Ok(Some(PollEvent::Error(err))) => Err(err),
            Ok(None) => Err(ProbeError::detector(
                DetectorErrorCode::Network,
                "poller stopped without publishing an event",
            )),
            Err(_) => {
                warn!(%request_id, "Subscription timed out");
                Err(ProbeError::detector(
                    DetectorErrorCode::Timeout,
                    format!(
                        "no result for {request_id} within {} ms",
                        options.timeout.as_millis()
                    ),
                ))
            }
        }
    }

    // -- Internals (callers hold the gate) ------------------------------------

    async fn submit(&self, image: Vec<u8>) -> Result<String> {
        let len = image.len();
        let request_id = self.backend.upload(&self.credential, image).await?;
        if request_id.is_empty() {
            return Err(ProbeError::detector(
                DetectorErrorCode::Other("empty_request_id".into()),
                "service returned an empty request id",
            ));
        }
        info!(%request_id, image_len = len, "Image submitted");
        Ok(request_id)
    }

    async fn poll_to_completion(&self, request_id: &str) -> Result<DetectionResult> {
        let max_attempts = self.polling.max_attempts();
        for attempt in 1..=max_attempts {
            match self.backend.fetch(request_id).await {
                Ok(PollState::Complete(result)) => {
                    info!(request_id, attempt, status = %result.status, "Result received");
                    return Ok(result);
                }
                Ok(PollState::Processing) => {
                    debug!(request_id, attempt, max_attempts, "Still processing");
                }
                Err(err) if is_retryable(&err) => {
                    warn!(request_id, attempt, max_attempts, error = %err, "Poll failed, retrying");
                }
                Err(err) => return Err(err),
            }
            if attempt < max_attempts {
                tokio::time::sleep(self.polling.interval()).await;
            }
        }

        warn!(request_id, max_attempts, "Polling budget exhausted");
        Err(ProbeError::detector(
            DetectorErrorCode::Timeout,
            format!("no result for {request_id} after {max_attempts} polls"),
        ))
    }
}

/// Poll until a terminal state, publish it once, and stop. Exits early
/// (publishing nothing) when `token` is cancelled.
async fn poll_events<B: DetectorBackend>(
    backend: Arc<B>,
    request_id: String,
    interval: Duration,
    token: CancelToken,
    tx: mpsc::Sender<PollEvent>,
) {
    loop {
        if token.is_cancelled() {
            return;
        }
        let event = match backend.fetch(&request_id).await {
            Ok(PollState::Complete(result)) => PollEvent::Result(result),
            Ok(PollState::Processing) => {
                debug!(%request_id, "Still processing");
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(interval) => continue,
                }
            }
            Err(err) if is_retryable(&err) => {
                warn!(%request_id, error = %err, "Poll failed, retrying");
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(interval) => continue,
                }
            }
            Err(err) => PollEvent::Error(err),
        };
        if tx.send(event).await.is_err() {
            debug!(%request_id, "Subscriber gone before event was delivered");
        }
        return;
    }
}

/// Read a file for submission, mapping every local failure to `invalid_file`.
async fn read_image(path: &Path) -> Result<Vec<u8>> {
    let invalid = |reason: String| ProbeError::detector(DetectorErrorCode::InvalidFile, reason);

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|err| invalid(format!("{}: {}", path.display(), err)))?;
    if !metadata.is_file() {
        return Err(invalid(format!("{} is not a regular file", path.display())));
    }
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| invalid(format!("{}: {}", path.display(), err)))?;
    if bytes.is_empty() {
        return Err(invalid(format!("{} is empty", path.display())));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::{RecordedVerdict, ReplayDetector, ReplayTable};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_polling() -> PollingConfig {
        PollingConfig {
            interval_ms: 1,
            timeout_ms: 5,
        }
    }

    fn verdict(status: &str, score: f64) -> RecordedVerdict {
        RecordedVerdict {
            status: status.into(),
            score: Some(score),
            models: Vec::new(),
        }
    }

    fn write_image(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).expect("write image");
        path
    }

    fn replay_client(
        pending_polls: u32,
        images: &[(&str, RecordedVerdict)],
    ) -> DetectionClient<ReplayDetector> {
        let mut detector =
            ReplayDetector::from_table(ReplayTable::default()).with_pending_polls(pending_polls);
        for (bytes, v) in images {
            detector = detector.record(bytes.as_bytes(), v.clone());
        }
        DetectionClient::new(detector, "test-key", fast_polling()).expect("client")
    }

    #[test]
    fn empty_credential_fails_at_construction() {
        let detector = ReplayDetector::from_table(ReplayTable::default());
        let err = DetectionClient::new(detector, "", PollingConfig::default())
            .err()
            .expect("must fail");
        assert_eq!(err.detector_code(), Some(&DetectorErrorCode::Unauthorized));
    }

    #[tokio::test]
    async fn missing_file_fails_locally_before_any_upload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = replay_client(0, &[]);
        let err = client
            .detect_file(&dir.path().join("non-existent.jpg"))
            .await
            .expect_err("must fail");
        assert_eq!(err.detector_code(), Some(&DetectorErrorCode::InvalidFile));
        assert_eq!(client.backend().upload_count(), 0);
    }

    #[tokio::test]
    async fn empty_file_and_directory_are_invalid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let empty = write_image(dir.path(), "empty.jpg", b"");
        let client = replay_client(0, &[]);
        for path in [empty.as_path(), dir.path()] {
            let err = client.upload(path).await.expect_err("must fail");
            assert_eq!(err.detector_code(), Some(&DetectorErrorCode::InvalidFile));
        }
    }

    #[tokio::test]
    async fn all_three_shapes_yield_the_same_verdict() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fake = write_image(dir.path(), "fake.jpeg", b"fake-image");
        let client = replay_client(2, &[("fake-image", verdict("MANIPULATED", 0.95))]);

        let direct = client.detect_file(&fake).await.expect("detect_file");
        let id = client.upload(&fake).await.expect("upload");
        let two_phase = client.get_result(&id).await.expect("get_result");
        let composed = client.upload_and_get_result(&fake).await.expect("composed");
        let options = PollOptions {
            interval: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        };
        let evented = client
            .upload_and_poll_events(&fake, options)
            .await
            .expect("events");

        for result in [&direct, &two_phase, &composed, &evented] {
            assert_eq!(result.status, "MANIPULATED");
            assert_eq!(result.score, Some(0.95));
            assert!(!result.request_id.is_empty());
        }
        assert_eq!(two_phase.request_id, id);
        assert_eq!(client.backend().upload_count(), 4);
    }

    #[tokio::test]
    async fn poll_budget_exhaustion_is_timeout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let real = write_image(dir.path(), "real.jpg", b"real-image");
        // fast_polling allows 5 attempts; 10 pending polls never complete.
        let client = replay_client(10, &[("real-image", verdict("AUTHENTIC", 0.18))]);
        let err = client.detect_file(&real).await.expect_err("timeout");
        assert_eq!(err.detector_code(), Some(&DetectorErrorCode::Timeout));
    }

    #[tokio::test]
    async fn event_subscription_times_out_and_cancels() {
        let dir = tempfile::tempdir().expect("tempdir");
        let real = write_image(dir.path(), "real.jpg", b"real-image");
        let client = replay_client(u32::MAX, &[("real-image", verdict("AUTHENTIC", 0.18))]);
        let options = PollOptions {
            interval: Duration::from_millis(5),
            timeout: Duration::from_millis(30),
        };
        let err = client
            .upload_and_poll_events(&real, options)
            .await
            .expect_err("timeout");
        assert_eq!(err.detector_code(), Some(&DetectorErrorCode::Timeout));
    }

    #[tokio::test]
    async fn unrecorded_image_fails_at_upload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let unknown = write_image(dir.path(), "unknown.jpg", b"unrecorded");
        let client = replay_client(0, &[]);
        let options = PollOptions {
            interval: Duration::from_millis(1),
            timeout: Duration::from_secs(1),
        };
        let err = client
            .upload_and_poll_events(&unknown, options)
            .await
            .expect_err("unknown image");
        assert!(matches!(
            err.detector_code(),
            Some(DetectorErrorCode::Other(code)) if code == "unknown_image"
        ));
    }

    #[tokio::test]
    async fn derived_client_presents_its_own_credential() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fake = write_image(dir.path(), "fake.jpeg", b"fake-image");
        let detector = ReplayDetector::from_table(ReplayTable::default())
            .record(b"fake-image", verdict("MANIPULATED", 0.95))
            .with_credential("good-key");
        let client = DetectionClient::new(detector, "good-key", fast_polling()).expect("client");

        let intruder = client.with_credential("bad-key").expect("derived client");
        let err = intruder.detect_file(&fake).await.expect_err("rejected");
        assert_eq!(err.detector_code(), Some(&DetectorErrorCode::Unauthorized));
        assert!(client.detect_file(&fake).await.is_ok());

        let err = client.with_credential("  ").err().expect("empty key");
        assert_eq!(err.detector_code(), Some(&DetectorErrorCode::Unauthorized));
    }

    /// Backend whose first polls fail with a transport error.
    struct FlakyBackend {
        failures_left: AtomicUsize,
        code: DetectorErrorCode,
    }

    impl FlakyBackend {
        fn new(failures: usize, code: DetectorErrorCode) -> Self {
            Self {
                failures_left: AtomicUsize::new(failures),
                code,
            }
        }
    }

    impl DetectorBackend for FlakyBackend {
        async fn upload(&self, _credential: &str, _image: Vec<u8>) -> Result<String> {
            Ok("req-flaky".into())
        }

        async fn fetch(&self, request_id: &str) -> Result<PollState> {
            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(ProbeError::detector(self.code.clone(), "connection reset"));
            }
            Ok(PollState::Complete(DetectionResult {
                request_id: request_id.to_owned(),
                status: "AUTHENTIC".into(),
                score: Some(0.18),
                models: Vec::new(),
            }))
        }
    }

    #[tokio::test]
    async fn transient_poll_failures_are_retried_within_budget() {
        let dir = tempfile::tempdir().expect("tempdir");
        let real = write_image(dir.path(), "real.jpg", b"real-image");
        let client = DetectionClient::new(
            FlakyBackend::new(2, DetectorErrorCode::Network),
            "key",
            fast_polling(),
        )
        .expect("client");
        let result = client.detect_file(&real).await.expect("recovered");
        assert_eq!(result.score, Some(0.18));

        let options = PollOptions {
            interval: Duration::from_millis(1),
            timeout: Duration::from_secs(1),
        };
        let client = DetectionClient::new(
            FlakyBackend::new(2, DetectorErrorCode::Network),
            "key",
            fast_polling(),
        )
        .expect("client");
        let evented = client
            .upload_and_poll_events(&real, options)
            .await
            .expect("recovered");
        assert_eq!(evented.status, "AUTHENTIC");
    }

    #[tokio::test]
    async fn permanent_poll_failure_is_not_retried() {
        let dir = tempfile::tempdir().expect("tempdir");
        let real = write_image(dir.path(), "real.jpg", b"real-image");
        let client = DetectionClient::new(
            FlakyBackend::new(1, DetectorErrorCode::Other("gone".into())),
            "key",
            fast_polling(),
        )
        .expect("client");
        let err = client.detect_file(&real).await.expect_err("permanent");
        assert!(matches!(
            err.detector_code(),
            Some(DetectorErrorCode::Other(code)) if code == "gone"
        ));
    }

    /// Backend that records how many submissions overlap.
    #[derive(Default)]
    struct OverlapBackend {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        issued: AtomicUsize,
    }

    impl DetectorBackend for OverlapBackend {
        async fn upload(&self, _credential: &str, _image: Vec<u8>) -> Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(format!("req-{}", self.issued.fetch_add(1, Ordering::SeqCst)))
        }

        async fn fetch(&self, request_id: &str) -> Result<PollState> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(PollState::Complete(DetectionResult {
                request_id: request_id.to_owned(),
                status: "AUTHENTIC".into(),
                score: Some(0.1),
                models: Vec::new(),
            }))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submissions_are_serialized() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = write_image(dir.path(), "img.jpg", b"bytes");
        let client = DetectionClient::new(
            OverlapBackend::default(),
            "key",
            PollingConfig::default(),
        )
        .expect("client");

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let client = client.clone();
                let image = image.clone();
                tokio::spawn(async move { client.detect_file(&image).await })
            })
            .collect();
        for task in tasks {
            task.await.expect("join").expect("detect");
        }

        assert_eq!(client.backend().issued.load(Ordering::SeqCst), 6);
        assert_eq!(
            client.backend().max_in_flight.load(Ordering::SeqCst),
            1,
            "submissions overlapped"
        );
    }
}
