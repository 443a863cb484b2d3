//! Error taxonomy for flag evaluation.
//!
//! [`ErrorCode`] is the closed set of reasons an evaluation can fall back to
//! the caller's default. Canonical codes and descriptions live in the
//! [`ERROR_CODES`] table.

use crate::value::ValueKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for provider resolutions.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Why an evaluation returned the default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ProviderNotReady,
    FlagNotFound,
    ParseError,
    TypeMismatch,
    TargetingKeyMissing,
    InvalidContext,
    General,
}

/// Canonical code string and description for every [`ErrorCode`].
pub const ERROR_CODES: [(ErrorCode, &str, &str); 7] = [
    (
        ErrorCode::ProviderNotReady,
        "PROVIDER_NOT_READY",
        "The value was resolved before the provider was ready",
    ),
    (
        ErrorCode::FlagNotFound,
        "FLAG_NOT_FOUND",
        "The flag could not be found",
    ),
    (
        ErrorCode::ParseError,
        "PARSE_ERROR",
        "An error was encountered parsing data, such as a flag configuration",
    ),
    (
        ErrorCode::TypeMismatch,
        "TYPE_MISMATCH",
        "The type of the flag value does not match the expected type",
    ),
    (
        ErrorCode::TargetingKeyMissing,
        "TARGETING_KEY_MISSING",
        "The provider requires a targeting key and one was not provided",
    ),
    (
        ErrorCode::InvalidContext,
        "INVALID_CONTEXT",
        "The evaluation context does not meet provider requirements",
    ),
    (
        ErrorCode::General,
        "GENERAL",
        "The error was for a reason not enumerated above",
    ),
];

impl ErrorCode {
    fn entry(&self) -> &'static (ErrorCode, &'static str, &'static str) {
        // ERROR_CODES is ordered by discriminant
        &ERROR_CODES[*self as usize]
    }

    /// Canonical code string, e.g. `"FLAG_NOT_FOUND"`.
    pub fn as_str(&self) -> &'static str {
        self.entry().1
    }

    /// Human readable description.
    pub fn description(&self) -> &'static str {
        self.entry().2
    }

    /// Parse a canonical code string.
    pub fn from_code(code: &str) -> Option<Self> {
        ERROR_CODES
            .iter()
            .find(|(_, canonical, _)| *canonical == code)
            .map(|(error_code, _, _)| *error_code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a provider instead of a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}{}", .message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
pub struct ProviderError {
    pub code: ErrorCode,
    pub message: Option<String>,
}

impl ProviderError {
    pub fn new(code: ErrorCode) -> Self {
        Self { code, message: None }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn flag_not_found(flag_key: &str) -> Self {
        Self::with_message(
            ErrorCode::FlagNotFound,
            format!("flag '{}' not found", flag_key),
        )
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::General, message)
    }
}

/// Error returned by the typed [`Value`](crate::Value) accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ValueKind,
        found: ValueKind,
    },
}

impl From<ValueError> for ProviderError {
    fn from(err: ValueError) -> Self {
        ProviderError::with_message(ErrorCode::TypeMismatch, err.to_string())
    }
}
