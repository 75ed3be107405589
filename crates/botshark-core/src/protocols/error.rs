use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::primitives::CipherError;

/// Errors raised by the Sality and ZeroAccess dissectors.
///
/// Every variant carries enough context to explain the failure on its own;
/// use [`DissectError::kind`] to match or count by category.
///
/// # Examples
/// ```
/// use botshark_core::{DissectError, DissectErrorKind};
///
/// let err = DissectError::TooShort { needed: 10, actual: 3 };
/// assert_eq!(err.kind(), DissectErrorKind::TooShort);
/// assert!(err.to_string().contains("message too short"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DissectError {
    #[error("message too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("checksum mismatch: embedded {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

/// Error category, independent of the per-error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DissectErrorKind {
    TooShort,
    ChecksumMismatch,
    UnknownCommand,
    MalformedPayload,
    InvalidOperation,
}

impl DissectError {
    pub fn kind(&self) -> DissectErrorKind {
        match self {
            DissectError::TooShort { .. } => DissectErrorKind::TooShort,
            DissectError::ChecksumMismatch { .. } => DissectErrorKind::ChecksumMismatch,
            DissectError::UnknownCommand(_) => DissectErrorKind::UnknownCommand,
            DissectError::MalformedPayload(_) => DissectErrorKind::MalformedPayload,
            DissectError::InvalidOperation(_) => DissectErrorKind::InvalidOperation,
        }
    }

    pub(crate) fn checksum_mismatch(expected: &[u8], actual: &[u8]) -> Self {
        DissectError::ChecksumMismatch {
            expected: hex::encode(expected),
            actual: hex::encode(actual),
        }
    }
}

impl From<CipherError> for DissectError {
    fn from(value: CipherError) -> Self {
        DissectError::MalformedPayload(value.to_string())
    }
}
