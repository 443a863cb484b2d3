//! In-memory feature provider.

use crate::flag::FlagDefinition;
use crate::loader::{FLAGS_FILE_ENV, FlagDocument, FlagLoader};
use crate::Result;
use async_trait::async_trait;
use flagline_core::{
    EvaluationContext, FeatureProvider, ProviderError, ProviderMetadata, ProviderResult, Reason,
    ResolutionDetails, Value, ValueError, ValueKind,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

const PROVIDER_NAME: &str = "in-memory";

/// Provider serving flags from definitions held in memory.
///
/// Definitions can be replaced at runtime with [`update_flags`](Self::update_flags);
/// each resolution sees either the old or the new set.
///
/// ```
/// use flagline_core::{EvaluationContext, FeatureProvider, Reason};
/// use flagline_memory::{FlagDefinition, InMemoryProvider};
///
/// let provider = InMemoryProvider::new([("dark-mode".to_string(), FlagDefinition::boolean(true))]);
///
/// # tokio_test::block_on(async {
/// let details = provider
///     .resolve_bool_value("dark-mode", false, &EvaluationContext::empty())
///     .await
///     .unwrap();
/// assert!(details.value);
/// assert_eq!(details.reason, Some(Reason::Static));
/// # });
/// ```
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    flags: RwLock<HashMap<String, FlagDefinition>>,
}

impl InMemoryProvider {
    pub fn new(flags: impl IntoIterator<Item = (String, FlagDefinition)>) -> Self {
        Self {
            flags: RwLock::new(flags.into_iter().collect()),
        }
    }

    pub fn from_document(document: FlagDocument) -> Self {
        Self::new(document.flags)
    }

    /// Load definitions from a JSON or TOML file, detected by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = FlagLoader::auto(path)?.load_file(path)?;
        info!(
            path = %path.display(),
            flags = document.flags.len(),
            "Loaded flag definitions"
        );
        Ok(Self::from_document(document))
    }

    /// Load definitions from the file named by `FLAGLINE_FLAGS_FILE`.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(FLAGS_FILE_ENV)?;
        Self::from_file(path)
    }

    /// Add or replace a single flag.
    pub fn set_flag(&self, key: impl Into<String>, flag: FlagDefinition) {
        self.flags.write().insert(key.into(), flag);
    }

    /// Replace every definition at once.
    pub fn update_flags(&self, flags: impl IntoIterator<Item = (String, FlagDefinition)>) {
        let flags: HashMap<_, _> = flags.into_iter().collect();
        debug!(flags = flags.len(), "Replacing flag definitions");
        *self.flags.write() = flags;
    }

    pub fn flag_keys(&self) -> Vec<String> {
        self.flags.read().keys().cloned().collect()
    }

    fn resolve<T>(
        &self,
        flag_key: &str,
        default_value: T,
        context: &EvaluationContext,
        convert: impl FnOnce(&Value) -> std::result::Result<T, ValueError>,
    ) -> ProviderResult<ResolutionDetails<T>> {
        let flags = self.flags.read();
        let flag = flags
            .get(flag_key)
            .ok_or_else(|| ProviderError::flag_not_found(flag_key))?;

        let Some(selection) = flag.evaluate(flag_key, context)? else {
            return Ok(ResolutionDetails::new(default_value)
                .with_reason(Reason::Disabled)
                .with_metadata(flag.metadata.clone()));
        };

        let value = convert(selection.value)?;
        Ok(ResolutionDetails::new(value)
            .with_variant(selection.variant)
            .with_reason(selection.reason)
            .with_metadata(flag.metadata.clone()))
    }
}

#[async_trait]
impl FeatureProvider for InMemoryProvider {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::new(PROVIDER_NAME)
    }

    async fn resolve_bool_value(
        &self,
        flag_key: &str,
        default_value: bool,
        context: &EvaluationContext,
    ) -> ProviderResult<ResolutionDetails<bool>> {
        self.resolve(flag_key, default_value, context, Value::as_bool)
    }

    async fn resolve_string_value(
        &self,
        flag_key: &str,
        default_value: String,
        context: &EvaluationContext,
    ) -> ProviderResult<ResolutionDetails<String>> {
        self.resolve(flag_key, default_value, context, |v| {
            v.as_str().map(str::to_string)
        })
    }

    async fn resolve_int_value(
        &self,
        flag_key: &str,
        default_value: i64,
        context: &EvaluationContext,
    ) -> ProviderResult<ResolutionDetails<i64>> {
        self.resolve(flag_key, default_value, context, Value::as_i64)
    }

    async fn resolve_float_value(
        &self,
        flag_key: &str,
        default_value: f64,
        context: &EvaluationContext,
    ) -> ProviderResult<ResolutionDetails<f64>> {
        // Integer variants widen to double
        self.resolve(flag_key, default_value, context, |v| match v {
            Value::Integer(i) => Ok(*i as f64),
            other => other.as_f64(),
        })
    }

    async fn resolve_struct_value(
        &self,
        flag_key: &str,
        default_value: Value,
        context: &EvaluationContext,
    ) -> ProviderResult<ResolutionDetails<Value>> {
        self.resolve(flag_key, default_value, context, |v| {
            if v.is_structured() {
                Ok(v.clone())
            } else {
                Err(ValueError::TypeMismatch {
                    expected: ValueKind::Structure,
                    found: v.kind(),
                })
            }
        })
    }
}
