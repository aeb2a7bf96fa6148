// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error classification for detector-boundary failures.
//
// Classes tell a caller what a failed submission means: fix the input
// (Local), fix the credential (Credential), try again later (Transient), or
// stop (Permanent).

use driftprobe_core::error::{DetectorErrorCode, ProbeError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Rejected before reaching the service: bad path, bad image, bad parameter.
    Local,
    /// Missing or rejected credential.
    Credential,
    /// Timeout or transport failure; a later attempt may succeed.
    Transient,
    /// The service rejected the request for good.
    Permanent,
}

impl ErrorClass {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Credential => "credential",
            Self::Transient => "transient",
            Self::Permanent => "permanent",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify a `ProbeError` into an `ErrorClass`.
pub fn classify_error(err: &ProbeError) -> ErrorClass {
    match err {
        ProbeError::Detector { code, .. } => match code {
            DetectorErrorCode::InvalidFile => ErrorClass::Local,
            DetectorErrorCode::Unauthorized => ErrorClass::Credential,
            DetectorErrorCode::Timeout | DetectorErrorCode::Network => ErrorClass::Transient,
            DetectorErrorCode::Other(_) => ErrorClass::Permanent,
        },

        ProbeError::InvalidImage(_)
        | ProbeError::InvalidParameter(_)
        | ProbeError::DimensionMismatch { .. }
        | ProbeError::Config(_) => ErrorClass::Local,

        ProbeError::IntegrityMismatch { .. } | ProbeError::Serialization(_) => {
            ErrorClass::Permanent
        }

        ProbeError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                ErrorClass::Local
            }
            _ => ErrorClass::Transient,
        },
    }
}

/// Whether repeating the same call could succeed. The client keeps polling
/// through retryable fetch failures until its budget runs out.
pub fn is_retryable(err: &ProbeError) -> bool {
    classify_error(err) == ErrorClass::Transient
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_file_is_local() {
        let err = ProbeError::detector(DetectorErrorCode::InvalidFile, "no such file");
        assert_eq!(classify_error(&err), ErrorClass::Local);
        assert!(!is_retryable(&err));
    }

    #[test]
    fn unauthorized_is_credential() {
        let err = ProbeError::detector(DetectorErrorCode::Unauthorized, "empty key");
        assert_eq!(classify_error(&err), ErrorClass::Credential);
    }

    #[test]
    fn timeout_and_network_are_transient() {
        for code in [DetectorErrorCode::Timeout, DetectorErrorCode::Network] {
            let err = ProbeError::detector(code, "x");
            assert!(is_retryable(&err));
        }
    }

    #[test]
    fn unknown_service_codes_are_permanent() {
        let err = ProbeError::detector(DetectorErrorCode::Other("quota_exceeded".into()), "x");
        assert_eq!(classify_error(&err), ErrorClass::Permanent);
    }

    #[test]
    fn io_errors_depend_on_kind() {
        let missing = ProbeError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(classify_error(&missing), ErrorClass::Local);
        let reset = ProbeError::Io(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        assert_eq!(classify_error(&reset), ErrorClass::Transient);
    }
}
