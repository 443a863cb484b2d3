//! Typed flag evaluation facade.
//!
//! Every evaluation returns a value of the requested type: the provider's
//! resolution on success, the caller's default otherwise. Provider failures,
//! including panics, are converted into [`FlagEvaluationDetails`] with
//! [`Reason::Error`](crate::Reason::Error) and never reach the caller.

use crate::api::FlagApi;
use crate::context::EvaluationContext;
use crate::details::{FlagEvaluationDetails, ResolutionDetails};
use crate::error::{ErrorCode, ProviderError, ProviderResult};
use crate::provider::{FeatureProvider, ProviderStatus};
use crate::value::Value;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::any::Any;
use std::fmt::Debug;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// A type a flag can be evaluated as.
///
/// Implemented for `bool`, `String`, `i64`, `f64` and [`Value`] (object
/// flags). Dispatches to the matching provider resolve method.
pub trait FlagType: Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Name used in logs and type mismatch messages.
    const TYPE_NAME: &'static str;

    fn resolve<'a>(
        provider: &'a dyn FeatureProvider,
        flag_key: &'a str,
        default_value: Self,
        context: &'a EvaluationContext,
    ) -> BoxFuture<'a, ProviderResult<ResolutionDetails<Self>>>;

    /// Whether a resolved value really is of this flag type.
    fn conforms(&self) -> bool {
        true
    }
}

impl FlagType for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn resolve<'a>(
        provider: &'a dyn FeatureProvider,
        flag_key: &'a str,
        default_value: Self,
        context: &'a EvaluationContext,
    ) -> BoxFuture<'a, ProviderResult<ResolutionDetails<Self>>> {
        provider.resolve_bool_value(flag_key, default_value, context)
    }
}

impl FlagType for String {
    const TYPE_NAME: &'static str = "string";

    fn resolve<'a>(
        provider: &'a dyn FeatureProvider,
        flag_key: &'a str,
        default_value: Self,
        context: &'a EvaluationContext,
    ) -> BoxFuture<'a, ProviderResult<ResolutionDetails<Self>>> {
        provider.resolve_string_value(flag_key, default_value, context)
    }
}

impl FlagType for i64 {
    const TYPE_NAME: &'static str = "integer";

    fn resolve<'a>(
        provider: &'a dyn FeatureProvider,
        flag_key: &'a str,
        default_value: Self,
        context: &'a EvaluationContext,
    ) -> BoxFuture<'a, ProviderResult<ResolutionDetails<Self>>> {
        provider.resolve_int_value(flag_key, default_value, context)
    }
}

impl FlagType for f64 {
    const TYPE_NAME: &'static str = "double";

    fn resolve<'a>(
        provider: &'a dyn FeatureProvider,
        flag_key: &'a str,
        default_value: Self,
        context: &'a EvaluationContext,
    ) -> BoxFuture<'a, ProviderResult<ResolutionDetails<Self>>> {
        provider.resolve_float_value(flag_key, default_value, context)
    }
}

impl FlagType for Value {
    const TYPE_NAME: &'static str = "object";

    fn resolve<'a>(
        provider: &'a dyn FeatureProvider,
        flag_key: &'a str,
        default_value: Self,
        context: &'a EvaluationContext,
    ) -> BoxFuture<'a, ProviderResult<ResolutionDetails<Self>>> {
        provider.resolve_struct_value(flag_key, default_value, context)
    }

    fn conforms(&self) -> bool {
        self.is_structured()
    }
}

/// Named client that evaluates flags against a [`FlagApi`]'s provider.
#[derive(Debug, Clone)]
pub struct Client {
    name: String,
    api: Arc<FlagApi>,
    evaluation_context: EvaluationContext,
}

impl Client {
    pub fn new(name: impl Into<String>, api: Arc<FlagApi>) -> Self {
        Self {
            name: name.into(),
            api,
            evaluation_context: EvaluationContext::empty(),
        }
    }

    /// Attach a context merged over the global one for every evaluation.
    pub fn with_evaluation_context(mut self, context: EvaluationContext) -> Self {
        self.evaluation_context = context;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn evaluation_context(&self) -> &EvaluationContext {
        &self.evaluation_context
    }

    pub async fn get_bool_value(
        &self,
        flag_key: &str,
        default_value: bool,
        context: Option<&EvaluationContext>,
    ) -> bool {
        self.evaluate(flag_key, default_value, context)
            .await
            .into_value()
    }

    pub async fn get_bool_details(
        &self,
        flag_key: &str,
        default_value: bool,
        context: Option<&EvaluationContext>,
    ) -> FlagEvaluationDetails<bool> {
        self.evaluate(flag_key, default_value, context).await
    }

    pub async fn get_string_value(
        &self,
        flag_key: &str,
        default_value: impl Into<String>,
        context: Option<&EvaluationContext>,
    ) -> String {
        self.evaluate(flag_key, default_value.into(), context)
            .await
            .into_value()
    }

    pub async fn get_string_details(
        &self,
        flag_key: &str,
        default_value: impl Into<String>,
        context: Option<&EvaluationContext>,
    ) -> FlagEvaluationDetails<String> {
        self.evaluate(flag_key, default_value.into(), context).await
    }

    pub async fn get_int_value(
        &self,
        flag_key: &str,
        default_value: i64,
        context: Option<&EvaluationContext>,
    ) -> i64 {
        self.evaluate(flag_key, default_value, context)
            .await
            .into_value()
    }

    pub async fn get_int_details(
        &self,
        flag_key: &str,
        default_value: i64,
        context: Option<&EvaluationContext>,
    ) -> FlagEvaluationDetails<i64> {
        self.evaluate(flag_key, default_value, context).await
    }

    pub async fn get_float_value(
        &self,
        flag_key: &str,
        default_value: f64,
        context: Option<&EvaluationContext>,
    ) -> f64 {
        self.evaluate(flag_key, default_value, context)
            .await
            .into_value()
    }

    pub async fn get_float_details(
        &self,
        flag_key: &str,
        default_value: f64,
        context: Option<&EvaluationContext>,
    ) -> FlagEvaluationDetails<f64> {
        self.evaluate(flag_key, default_value, context).await
    }

    /// Evaluate a structured flag. Pass [`Value::Null`] for "no default".
    pub async fn get_object_value(
        &self,
        flag_key: &str,
        default_value: Value,
        context: Option<&EvaluationContext>,
    ) -> Value {
        self.evaluate(flag_key, default_value, context)
            .await
            .into_value()
    }

    pub async fn get_object_details(
        &self,
        flag_key: &str,
        default_value: Value,
        context: Option<&EvaluationContext>,
    ) -> FlagEvaluationDetails<Value> {
        self.evaluate(flag_key, default_value, context).await
    }

    /// Evaluate a flag of any [`FlagType`].
    pub async fn evaluate<T: FlagType>(
        &self,
        flag_key: &str,
        default_value: T,
        context: Option<&EvaluationContext>,
    ) -> FlagEvaluationDetails<T> {
        let details = self.evaluate_inner(flag_key, default_value, context).await;

        match details.error_code() {
            Some(code) => warn!(
                client = %self.name,
                flag_key,
                flag_type = T::TYPE_NAME,
                error_code = %code,
                error_message = details.error_message().unwrap_or_default(),
                "Flag evaluation fell back to default"
            ),
            None => debug!(
                client = %self.name,
                flag_key,
                flag_type = T::TYPE_NAME,
                reason = %details.reason(),
                variant = details.variant().unwrap_or_default(),
                "Flag resolved"
            ),
        }

        details
    }

    async fn evaluate_inner<T: FlagType>(
        &self,
        flag_key: &str,
        default_value: T,
        context: Option<&EvaluationContext>,
    ) -> FlagEvaluationDetails<T> {
        // Clone the Arc out of the registry so no lock is held while awaiting
        let Some(provider) = self.api.current_provider() else {
            return FlagEvaluationDetails::error(
                flag_key,
                default_value,
                ProviderError::with_message(
                    ErrorCode::ProviderNotReady,
                    "no provider registered",
                ),
            );
        };

        // Status and metadata run inside the unwind guard too
        let context = self.merged_context(context);
        let resolution = AssertUnwindSafe(async {
            if provider.status() == ProviderStatus::NotReady {
                return Err(ProviderError::with_message(
                    ErrorCode::ProviderNotReady,
                    format!("provider '{}' is not ready", provider.metadata().name),
                ));
            }
            T::resolve(provider.as_ref(), flag_key, default_value.clone(), &context).await
        })
        .catch_unwind()
        .await;

        match resolution {
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(
                    client = %self.name,
                    flag_key,
                    panic = %message,
                    "Feature provider panicked"
                );
                FlagEvaluationDetails::error(
                    flag_key,
                    default_value,
                    ProviderError::general(format!("provider panicked: {}", message)),
                )
            }
            Ok(Err(err)) => FlagEvaluationDetails::error(flag_key, default_value, err),
            Ok(Ok(resolution)) if resolution.is_error() => {
                let err = ProviderError {
                    code: resolution.error_code.unwrap_or(ErrorCode::General),
                    message: resolution.error_message,
                };
                FlagEvaluationDetails::error(flag_key, default_value, err)
            }
            // A provider handing back the caller's default (disabled flag, Null
            // object default) is not a type mismatch
            Ok(Ok(resolution))
                if !resolution.value.conforms() && resolution.value != default_value =>
            {
                FlagEvaluationDetails::error(
                    flag_key,
                    default_value,
                    ProviderError::with_message(
                        ErrorCode::TypeMismatch,
                        format!(
                            "resolved value {:?} is not a valid {} value",
                            resolution.value,
                            T::TYPE_NAME
                        ),
                    ),
                )
            }
            Ok(Ok(resolution)) => FlagEvaluationDetails::resolved(flag_key, resolution),
        }
    }

    /// Global context, then client context, then invocation context.
    fn merged_context(&self, invocation: Option<&EvaluationContext>) -> EvaluationContext {
        let merged = self.api.evaluation_context().merge(&self.evaluation_context);
        match invocation {
            Some(context) => merged.merge(context),
            None => merged,
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
