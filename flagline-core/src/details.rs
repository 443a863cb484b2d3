//! Resolution results.
//!
//! Providers return [`ResolutionDetails`]; the client turns them into
//! [`FlagEvaluationDetails`], which always carries a well-typed value.

use crate::error::{ErrorCode, ProviderError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Why a particular value was returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    /// The resolved value is statically configured
    Static,
    /// The resolved value fell back to a pre-configured value
    Default,
    /// The resolved value was the result of a targeting match
    TargetingMatch,
    /// The resolved value was the result of pseudorandom assignment
    Split,
    /// The flag is disabled
    Disabled,
    /// The resolved value came from a cache that may be out of date
    Stale,
    Unknown,
    /// The resolution failed and the caller's default was returned
    Error,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Static => "STATIC",
            Reason::Default => "DEFAULT",
            Reason::TargetingMatch => "TARGETING_MATCH",
            Reason::Split => "SPLIT",
            Reason::Disabled => "DISABLED",
            Reason::Stale => "STALE",
            Reason::Unknown => "UNKNOWN",
            Reason::Error => "ERROR",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primitive value attached to a resolution as metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagMetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<bool> for FlagMetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FlagMetadataValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FlagMetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FlagMetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FlagMetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Arbitrary provider metadata about a flag.
pub type FlagMetadata = BTreeMap<String, FlagMetadataValue>;

/// Successful resolution reported by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionDetails<T> {
    pub value: T,
    pub variant: Option<String>,
    pub reason: Option<Reason>,
    /// Code describing the failure when `reason` is [`Reason::Error`]
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
    pub flag_metadata: FlagMetadata,
}

impl<T> ResolutionDetails<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            variant: None,
            reason: None,
            error_code: None,
            error_message: None,
            flag_metadata: FlagMetadata::new(),
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn with_reason(mut self, reason: Reason) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Report an error alongside a value; sets the reason to [`Reason::Error`].
    pub fn with_error(mut self, code: ErrorCode, message: Option<String>) -> Self {
        self.reason = Some(Reason::Error);
        self.error_code = Some(code);
        self.error_message = message;
        self
    }

    pub fn with_metadata(mut self, metadata: FlagMetadata) -> Self {
        self.flag_metadata = metadata;
        self
    }

    /// Convert the value, keeping the rest of the resolution.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResolutionDetails<U> {
        ResolutionDetails {
            value: f(self.value),
            variant: self.variant,
            reason: self.reason,
            error_code: self.error_code,
            error_message: self.error_message,
            flag_metadata: self.flag_metadata,
        }
    }

    /// True when the provider flagged the resolution as failed.
    pub fn is_error(&self) -> bool {
        self.reason == Some(Reason::Error) || self.error_code.is_some()
    }
}

/// Outcome of a client evaluation.
///
/// `error_code` is present exactly when `reason` is [`Reason::Error`], and in
/// that case `value` is the caller's default.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagEvaluationDetails<T> {
    flag_key: String,
    value: T,
    variant: Option<String>,
    reason: Reason,
    error_code: Option<ErrorCode>,
    error_message: Option<String>,
    flag_metadata: FlagMetadata,
}

impl<T> FlagEvaluationDetails<T> {
    /// Details for a successful resolution. A missing provider reason becomes
    /// [`Reason::Unknown`].
    pub fn resolved(flag_key: impl Into<String>, resolution: ResolutionDetails<T>) -> Self {
        let reason = match resolution.reason {
            Some(Reason::Error) | None => Reason::Unknown,
            Some(reason) => reason,
        };

        Self {
            flag_key: flag_key.into(),
            value: resolution.value,
            variant: resolution.variant,
            reason,
            error_code: None,
            error_message: None,
            flag_metadata: resolution.flag_metadata,
        }
    }

    /// Details for a failed evaluation carrying the caller's default.
    pub fn error(flag_key: impl Into<String>, default_value: T, error: ProviderError) -> Self {
        Self {
            flag_key: flag_key.into(),
            value: default_value,
            variant: None,
            reason: Reason::Error,
            error_code: Some(error.code),
            error_message: error.message,
            flag_metadata: FlagMetadata::new(),
        }
    }

    pub fn flag_key(&self) -> &str {
        &self.flag_key
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error_code
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn flag_metadata(&self) -> &FlagMetadata {
        &self.flag_metadata
    }

    pub fn is_error(&self) -> bool {
        self.reason == Reason::Error
    }
}
