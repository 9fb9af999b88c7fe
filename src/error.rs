//! Error taxonomy for metadata resolution and document patching.
//!
//! Every failure is contained to the record being processed; the run loop
//! decides how to report it.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnrichError {
    /// Transport failure or a throttling status (429/503). Retryable.
    #[error("{provider}: network failure: {message}")]
    NetworkFailure {
        provider: &'static str,
        message: String,
    },

    /// Non-2xx status that is not eligible for retry. Fatal for that provider only.
    #[error("{provider}: request rejected with status {status}: {message}")]
    ProviderRejected {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("{provider}: invalid response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },

    #[error("no match found for '{title}'")]
    NoMatchFound { title: String },

    #[error("malformed document {path:?}: {reason}")]
    MalformedDocument { path: PathBuf, reason: String },

    #[error("block has no '{field}' key")]
    MissingRequiredField { field: String },

    #[error("missing credential: {name}")]
    MissingCredential { name: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EnrichError {
    /// Returns true if the operation that produced this error may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, EnrichError::NetworkFailure { .. })
    }

    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        EnrichError::MalformedDocument {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Short label used in progress lines and in the run summary failure breakdown.
    pub fn kind(&self) -> &'static str {
        match self {
            EnrichError::NetworkFailure { .. } => "network_failure",
            EnrichError::ProviderRejected { .. } => "provider_rejected",
            EnrichError::InvalidResponse { .. } => "invalid_response",
            EnrichError::NoMatchFound { .. } => "no_match_found",
            EnrichError::MalformedDocument { .. } => "malformed_document",
            EnrichError::MissingRequiredField { .. } => "missing_required_field",
            EnrichError::MissingCredential { .. } => "missing_credential",
            EnrichError::Io(_) => "io_failure",
        }
    }
}

pub type EnrichResult<T> = Result<T, EnrichError>;
