// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for driftprobe.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes reported by the detection service boundary.
///
/// The string forms match the codes the service itself uses, so recorded
/// results and logs stay comparable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorErrorCode {
    /// Local validation of the submitted file failed before any network call.
    InvalidFile,
    /// Missing or rejected credential.
    Unauthorized,
    /// The result did not become final within the polling budget.
    Timeout,
    /// Transport-level failure talking to the service.
    Network,
    /// Any other code the service reported.
    Other(String),
}

impl DetectorErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::InvalidFile => "invalid_file",
            Self::Unauthorized => "unauthorized",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::Other(code) => code,
        }
    }
}

impl std::fmt::Display for DetectorErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for all driftprobe operations.
#[derive(Debug, Error)]
pub enum ProbeError {
    // -- Imaging errors --
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("dimension mismatch: expected {}x{}, got {}x{}", expected.0, expected.1, actual.0, actual.1)]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    // -- Detector boundary --
    #[error("detector error [{code}]: {message}")]
    Detector {
        code: DetectorErrorCode,
        message: String,
    },

    // -- Integrity / configuration --
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    #[error("configuration error: {0}")]
    Config(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProbeError {
    /// Shorthand for building a detector-boundary error.
    pub fn detector(code: DetectorErrorCode, message: impl Into<String>) -> Self {
        Self::Detector {
            code,
            message: message.into(),
        }
    }

    /// The detector code, if this error came from the detector boundary.
    pub fn detector_code(&self) -> Option<&DetectorErrorCode> {
        match self {
            Self::Detector { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detector_codes_use_service_strings() {
        assert_eq!(DetectorErrorCode::InvalidFile.as_str(), "invalid_file");
        assert_eq!(DetectorErrorCode::Unauthorized.as_str(), "unauthorized");
        assert_eq!(DetectorErrorCode::Other("quota".into()).to_string(), "quota");
    }

    #[test]
    fn dimension_mismatch_message() {
        let err = ProbeError::DimensionMismatch {
            expected: (640, 480),
            actual: (320, 240),
        };
        assert_eq!(
            err.to_string(),
            "dimension mismatch: expected 640x480, got 320x240"
        );
    }

    #[test]
    fn detector_code_only_for_detector_errors() {
        let err = ProbeError::detector(DetectorErrorCode::Timeout, "gave up");
        assert_eq!(err.detector_code(), Some(&DetectorErrorCode::Timeout));
        assert!(ProbeError::InvalidImage("x".into()).detector_code().is_none());
    }
}
