//! Flag source abstraction.

use crate::context::EvaluationContext;
use crate::details::ResolutionDetails;
use crate::error::ProviderResult;
use crate::value::Value;
use async_trait::async_trait;

/// Descriptive information about a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMetadata {
    pub name: String,
}

impl ProviderMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Readiness of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderStatus {
    /// Not yet able to resolve flags
    NotReady,
    #[default]
    Ready,
    /// Serving possibly out of date values
    Stale,
    /// Last attempt to refresh the flag source failed
    Error,
}

/// A pluggable flag source.
///
/// Each resolve method receives the caller's default so a provider can echo it
/// back (e.g. for disabled flags). Failures are reported as a
/// [`ProviderError`](crate::ProviderError) carrying an
/// [`ErrorCode`](crate::ErrorCode), or as a resolution whose reason is
/// [`Reason::Error`](crate::Reason::Error).
#[async_trait]
pub trait FeatureProvider: Send + Sync {
    fn metadata(&self) -> ProviderMetadata;

    /// Current readiness. The client does not call a `NotReady` provider.
    fn status(&self) -> ProviderStatus {
        ProviderStatus::Ready
    }

    async fn resolve_bool_value(
        &self,
        flag_key: &str,
        default_value: bool,
        context: &EvaluationContext,
    ) -> ProviderResult<ResolutionDetails<bool>>;

    async fn resolve_string_value(
        &self,
        flag_key: &str,
        default_value: String,
        context: &EvaluationContext,
    ) -> ProviderResult<ResolutionDetails<String>>;

    async fn resolve_int_value(
        &self,
        flag_key: &str,
        default_value: i64,
        context: &EvaluationContext,
    ) -> ProviderResult<ResolutionDetails<i64>>;

    async fn resolve_float_value(
        &self,
        flag_key: &str,
        default_value: f64,
        context: &EvaluationContext,
    ) -> ProviderResult<ResolutionDetails<f64>>;

    /// Resolve a structured flag. `default_value` is [`Value::Null`] when the
    /// caller has no default.
    async fn resolve_struct_value(
        &self,
        flag_key: &str,
        default_value: Value,
        context: &EvaluationContext,
    ) -> ProviderResult<ResolutionDetails<Value>>;
}
