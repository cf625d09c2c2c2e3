// Error taxonomy for a run.
//
// Configuration, missing folders and registration failures abort the whole
// run. Signing, transfer and confirm failures belong to a single upload
// handle: the orchestrator records them and moves on to the next handle.

use std::path::PathBuf;
use thiserror::Error;

/// Why a single HTTP exchange with the service (or the signed storage URL)
/// did not succeed.
#[derive(Error, Debug)]
pub enum RequestFailure {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("could not read local file: {0}")]
    Read(String),
}

impl RequestFailure {
    /// Network errors, 5xx responses and 429 are worth another attempt.
    /// Everything else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            RequestFailure::Network(_) => true,
            RequestFailure::Status { status, .. } => *status >= 500 || *status == 429,
            RequestFailure::Decode(_) | RequestFailure::Read(_) => false,
        }
    }

    /// HTTP status code, when the failure carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestFailure::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RequestFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RequestFailure::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            RequestFailure::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            RequestFailure::Network(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("folder not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("registration failed: {0}")]
    Registration(String),

    #[error("signing upload {upload_id} failed: {source}")]
    Signing {
        upload_id: String,
        source: RequestFailure,
    },

    #[error("transfer for upload {upload_id} failed: {source}")]
    Transfer {
        upload_id: String,
        source: RequestFailure,
    },

    #[error("confirming upload {upload_id} failed: {source}")]
    Confirm {
        upload_id: String,
        source: RequestFailure,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Status code of the failing request for per-handle errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            UploadError::Signing { source, .. }
            | UploadError::Transfer { source, .. }
            | UploadError::Confirm { source, .. } => source.status(),
            _ => None,
        }
    }
}

impl From<RequestFailure> for UploadError {
    fn from(failure: RequestFailure) -> Self {
        UploadError::Registration(failure.to_string())
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, UploadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_throttling_are_retryable() {
        for status in [500, 502, 503, 504, 429] {
            let f = RequestFailure::Status {
                status,
                body: String::new(),
            };
            assert!(f.is_retryable(), "status {} should be retryable", status);
        }
        assert!(RequestFailure::Network("connection reset".into()).is_retryable());
    }

    #[test]
    fn client_errors_and_bad_bodies_are_final() {
        for status in [400, 401, 403, 404, 422] {
            let f = RequestFailure::Status {
                status,
                body: String::new(),
            };
            assert!(!f.is_retryable(), "status {} should be final", status);
        }
        assert!(!RequestFailure::Decode("missing field `upload_url`".into()).is_retryable());
        assert!(!RequestFailure::Read("permission denied".into()).is_retryable());
    }

    #[test]
    fn per_handle_errors_expose_status_code() {
        let err = UploadError::Transfer {
            upload_id: "u1".into(),
            source: RequestFailure::Status {
                status: 403,
                body: "expired".into(),
            },
        };
        assert_eq!(err.status(), Some(403));
        assert_eq!(
            err.to_string(),
            "transfer for upload u1 failed: HTTP 403: expired"
        );
        assert_eq!(UploadError::Config("x".into()).status(), None);
    }
}
