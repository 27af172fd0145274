//! Error types for the mailforge library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`MailforgeError`] is **fatal**: the run cannot proceed at all (bundle
//!   missing, login form changed, credentials rejected). Returned as
//!   `Err(MailforgeError)` from the top-level `generate*` functions. A fatal
//!   auth error always fires before the first upload, so nothing partially
//!   cached is ever lost to it.
//!
//! * [`UploadJobError`] is **non-fatal**: a single image upload failed
//!   (malformed response, transient network error) but every other job is
//!   fine. The affected logical name is simply absent from the resolved map
//!   and the run continues with a best-effort newsletter.
//!
//! Two further failure modes are deliberately *not* errors at all: an
//! unreadable cache file degrades to an empty cache with a warning, and a
//! hosted page missing both direct-URL extraction targets falls back to the
//! landing-page URL.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the mailforge library.
///
/// Per-image failures use [`UploadJobError`] and are reported in
/// [`crate::generate::RunStats`] rather than propagated here.
#[derive(Debug, Error)]
pub enum MailforgeError {
    // ── Bundle errors ─────────────────────────────────────────────────────
    /// The bundle directory was not found at the given path.
    #[error("Bundle directory not found: '{path}'\nCheck the path exists and is readable.")]
    BundleNotFound { path: PathBuf },

    /// The bundle contains no HTML document to parse.
    #[error("No exported HTML document found in bundle '{path}'\nExpected exactly one .html file.")]
    DocumentMissing { path: PathBuf },

    /// The exported document exists but could not be read.
    #[error("Failed to read exported document '{path}': {source}")]
    DocumentUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Auth errors (always abort before the first upload) ───────────────
    /// The login page no longer carries the hidden CSRF input.
    #[error("Login page has no 'csrf_hash' input field.\nThe host likely changed its login form.")]
    CsrfTokenMissing,

    /// Login request completed but the host rejected the credentials.
    #[error("Login rejected by the image host (HTTP {status})\nCheck POSTIMAGES_EMAIL / POSTIMAGES_PASSWORD.")]
    LoginRejected { status: u16 },

    /// The authenticated API page no longer carries the api_key input.
    #[error("API page has no 'api_key' input field.\nThe host likely changed its account page.")]
    ApiTokenMissing,

    /// A login or token request failed at the transport level.
    #[error("Auth request failed during {step}: {reason}\nCheck your internet connection.")]
    AuthRequestFailed { step: &'static str, reason: String },

    /// An auth request exceeded the configured timeout.
    #[error("Auth request timed out after {secs}s during {step}\nIncrease the request timeout.")]
    AuthTimeout { step: &'static str, secs: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output HTML file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A template body failed to parse or render.
    #[error("Template '{name}' failed: {detail}")]
    TemplateFailed { name: &'static str, detail: String },

    // ── Cancellation ──────────────────────────────────────────────────────
    /// The cancel flag was raised; the run stopped between jobs.
    #[error("Run cancelled before completion")]
    Cancelled,

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image upload.
///
/// Reported alongside [`crate::pipeline::resolve::ResolutionOutcome`] when a
/// job fails. The overall run continues; the logical name stays unmapped.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum UploadJobError {
    /// The upload request failed at the transport level.
    #[error("'{name}': upload request failed: {reason}")]
    RequestFailed { name: String, reason: String },

    /// The host answered with a non-200 status.
    #[error("'{name}': upload rejected with HTTP {status}")]
    Rejected { name: String, status: u16 },

    /// The 200 response body was not the expected JSON shape.
    #[error("'{name}': malformed upload response: {detail}")]
    MalformedResponse { name: String, detail: String },

    /// Valid JSON, but the status flag or hosted-page URL is missing.
    #[error("'{name}': upload response carries no OK status flag")]
    StatusFlagMissing { name: String },

    /// The upload exceeded the configured timeout.
    #[error("'{name}': upload timed out after {secs}s")]
    Timeout { name: String, secs: u64 },
}

impl UploadJobError {
    /// The logical name of the job that failed.
    pub fn logical_name(&self) -> &str {
        match self {
            UploadJobError::RequestFailed { name, .. }
            | UploadJobError::Rejected { name, .. }
            | UploadJobError::MalformedResponse { name, .. }
            | UploadJobError::StatusFlagMissing { name }
            | UploadJobError::Timeout { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_rejected_display() {
        let e = MailforgeError::LoginRejected { status: 403 };
        let msg = e.to_string();
        assert!(msg.contains("403"), "got: {msg}");
    }

    #[test]
    fn csrf_missing_display() {
        let e = MailforgeError::CsrfTokenMissing;
        assert!(e.to_string().contains("csrf_hash"));
    }

    #[test]
    fn job_error_logical_name() {
        let e = UploadJobError::StatusFlagMissing {
            name: "banner.png".into(),
        };
        assert_eq!(e.logical_name(), "banner.png");
        assert!(e.to_string().contains("banner.png"));
    }

    #[test]
    fn job_timeout_display() {
        let e = UploadJobError::Timeout {
            name: "logo.png".into(),
            secs: 30,
        };
        assert!(e.to_string().contains("30s"));
    }
}
