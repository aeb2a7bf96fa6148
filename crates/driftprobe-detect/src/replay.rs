// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Replay backend — answers detection requests from a recorded table keyed by
// the SHA-256 of the submitted bytes. Runs offline and deterministically.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use driftprobe_core::error::{DetectorErrorCode, ProbeError, Result};
use driftprobe_core::integrity::hash_bytes;
use driftprobe_core::types::{DetectionResult, ModelResult, PollState};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::backend::DetectorBackend;

/// A recorded service verdict, without a request id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedVerdict {
    pub status: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub models: Vec<ModelResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayEntry {
    /// Hex SHA-256 of the image bytes this verdict was recorded for.
    pub sha256: String,
    /// Free-form note, typically the fixture label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub result: RecordedVerdict,
}

/// On-disk replay table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayTable {
    /// Polls answered with "processing" before each request completes.
    #[serde(default)]
    pub pending_polls: u32,
    /// Credential uploads must carry. `None` accepts any credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_credential: Option<String>,
    #[serde(default)]
    pub entries: Vec<ReplayEntry>,
}

#[derive(Debug)]
struct InFlight {
    verdict: RecordedVerdict,
    remaining_pending: u32,
}

/// [`DetectorBackend`] backed by a [`ReplayTable`].
#[derive(Debug)]
pub struct ReplayDetector {
    verdicts: HashMap<String, RecordedVerdict>,
    expected_credential: Option<String>,
    pending_polls: u32,
    requests: Mutex<HashMap<String, InFlight>>,
    uploads: AtomicUsize,
}

impl ReplayDetector {
    pub fn from_table(table: ReplayTable) -> Self {
        let verdicts = table
            .entries
            .into_iter()
            .map(|entry| (entry.sha256.to_ascii_lowercase(), entry.result))
            .collect();
        Self {
            verdicts,
            expected_credential: table.expected_credential,
            pending_polls: table.pending_polls,
            requests: Mutex::new(HashMap::new()),
            uploads: AtomicUsize::new(0),
        }
    }

    /// Load a replay table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|err| {
            ProbeError::Config(format!(
                "failed to read replay table {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        let table: ReplayTable = serde_json::from_str(&raw)?;
        info!(
            entries = table.entries.len(),
            pending_polls = table.pending_polls,
            "Replay table loaded"
        );
        Ok(Self::from_table(table))
    }

    /// Reject uploads whose credential differs from `credential`.
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.expected_credential = Some(credential.into());
        self
    }

    pub fn expected_credential(&self) -> Option<&str> {
        self.expected_credential.as_deref()
    }

    pub fn with_pending_polls(mut self, pending_polls: u32) -> Self {
        self.pending_polls = pending_polls;
        self
    }

    /// Add or replace the verdict for `image`.
    pub fn record(mut self, image: &[u8], verdict: RecordedVerdict) -> Self {
        self.verdicts.insert(hash_bytes(image), verdict);
        self
    }

    /// Number of uploads accepted so far.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    fn requests(&self) -> std::sync::MutexGuard<'_, HashMap<String, InFlight>> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DetectorBackend for ReplayDetector {
    #[instrument(skip(self, credential, image), fields(image_len = image.len()))]
    async fn upload(&self, credential: &str, image: Vec<u8>) -> Result<String> {
        if let Some(expected) = &self.expected_credential {
            if expected != credential {
                warn!("Credential rejected");
                return Err(ProbeError::detector(
                    DetectorErrorCode::Unauthorized,
                    "credential rejected by replay backend",
                ));
            }
        }

        let digest = hash_bytes(&image);
        let verdict = self.verdicts.get(&digest).cloned().ok_or_else(|| {
            ProbeError::detector(
                DetectorErrorCode::Other("unknown_image".into()),
                format!("no recorded verdict for image {digest}"),
            )
        })?;

        let request_id = Uuid::new_v4().to_string();
        self.requests().insert(
            request_id.clone(),
            InFlight {
                verdict,
                remaining_pending: self.pending_polls,
            },
        );
        self.uploads.fetch_add(1, Ordering::SeqCst);
        debug!(%request_id, sha256 = %digest, "Replay request accepted");
        Ok(request_id)
    }

    async fn fetch(&self, request_id: &str) -> Result<PollState> {
        let mut requests = self.requests();
        let in_flight = requests
            .get_mut(request_id)
            .ok_or_else(|| unknown_request(request_id))?;

        if in_flight.remaining_pending > 0 {
            in_flight.remaining_pending -= 1;
            return Ok(PollState::Processing);
        }

        // Completed requests are dropped; the id is not answerable again.
        let verdict = requests
            .remove(request_id)
            .ok_or_else(|| unknown_request(request_id))?
            .verdict;
        Ok(PollState::Complete(DetectionResult {
            request_id: request_id.to_owned(),
            status: verdict.status,
            score: verdict.score,
            models: verdict.models,
        }))
    }
}

fn unknown_request(request_id: &str) -> ProbeError {
    ProbeError::detector(
        DetectorErrorCode::Other("unknown_request".into()),
        format!("no such request: {request_id}"),
    )
}
