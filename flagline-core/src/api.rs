//! Provider registry and global evaluation context.

use crate::client::Client;
use crate::context::EvaluationContext;
use crate::provider::FeatureProvider;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// Process-wide flag evaluation state.
///
/// Create one at startup, register a provider, and share it by `Arc` with
/// everything that needs a [`Client`]. The provider slot is swapped
/// atomically: an evaluation sees either the old or the new provider.
///
/// # Examples
///
/// ```
/// use flagline_core::FlagApi;
///
/// # tokio_test::block_on(async {
/// let api = FlagApi::new();
/// let client = api.client("checkout");
///
/// // Nothing registered yet: the default comes back
/// assert!(!client.get_bool_value("new-ui", false, None).await);
/// # });
/// ```
#[derive(Default)]
pub struct FlagApi {
    provider: RwLock<Option<Arc<dyn FeatureProvider>>>,
    evaluation_context: RwLock<EvaluationContext>,
}

impl FlagApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a provider, replacing any previous one.
    pub fn register_provider<P: FeatureProvider + 'static>(&self, provider: P) {
        self.register_shared_provider(Arc::new(provider));
    }

    /// Register a provider that is already shared.
    pub fn register_shared_provider(&self, provider: Arc<dyn FeatureProvider>) {
        let name = provider.metadata().name;
        let previous = self.provider.write().replace(provider);

        match previous {
            Some(old) => info!(
                provider = %name,
                replaced = %old.metadata().name,
                "Feature provider replaced"
            ),
            None => info!(provider = %name, "Feature provider registered"),
        }
    }

    /// The registered provider, if any.
    pub fn current_provider(&self) -> Option<Arc<dyn FeatureProvider>> {
        self.provider.read().clone()
    }

    /// Remove the registered provider. Later evaluations return
    /// `PROVIDER_NOT_READY`.
    pub fn clear_provider(&self) -> Option<Arc<dyn FeatureProvider>> {
        self.provider.write().take()
    }

    /// Set the context merged under every client and invocation context.
    pub fn set_evaluation_context(&self, context: EvaluationContext) {
        *self.evaluation_context.write() = context;
    }

    pub fn evaluation_context(&self) -> EvaluationContext {
        self.evaluation_context.read().clone()
    }

    /// Create a named client bound to this registry.
    pub fn client(self: &Arc<Self>, name: impl Into<String>) -> Client {
        Client::new(name, Arc::clone(self))
    }
}

impl std::fmt::Debug for FlagApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagApi")
            .field(
                "provider",
                &self.provider.read().as_ref().map(|p| p.metadata().name),
            )
            .field("evaluation_context", &*self.evaluation_context.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::ResolutionDetails;
    use crate::error::ProviderResult;
    use crate::provider::ProviderMetadata;
    use crate::value::Value;
    use async_trait::async_trait;

    struct NamedProvider(&'static str);

    #[async_trait]
    impl FeatureProvider for NamedProvider {
        fn metadata(&self) -> ProviderMetadata {
            ProviderMetadata::new(self.0)
        }

        async fn resolve_bool_value(
            &self,
            _flag_key: &str,
            default_value: bool,
            _context: &EvaluationContext,
        ) -> ProviderResult<ResolutionDetails<bool>> {
            Ok(ResolutionDetails::new(default_value))
        }

        async fn resolve_string_value(
            &self,
            _flag_key: &str,
            _default_value: String,
            _context: &EvaluationContext,
        ) -> ProviderResult<ResolutionDetails<String>> {
            Ok(ResolutionDetails::new(self.0.to_string()))
        }

        async fn resolve_int_value(
            &self,
            _flag_key: &str,
            default_value: i64,
            _context: &EvaluationContext,
        ) -> ProviderResult<ResolutionDetails<i64>> {
            Ok(ResolutionDetails::new(default_value))
        }

        async fn resolve_float_value(
            &self,
            _flag_key: &str,
            default_value: f64,
            _context: &EvaluationContext,
        ) -> ProviderResult<ResolutionDetails<f64>> {
            Ok(ResolutionDetails::new(default_value))
        }

        async fn resolve_struct_value(
            &self,
            _flag_key: &str,
            default_value: Value,
            _context: &EvaluationContext,
        ) -> ProviderResult<ResolutionDetails<Value>> {
            Ok(ResolutionDetails::new(default_value))
        }
    }

    #[test]
    fn test_no_provider_by_default() {
        let api = FlagApi::new();
        assert!(api.current_provider().is_none());
    }

    #[test]
    fn test_register_last_write_wins() {
        let api = FlagApi::new();
        api.register_provider(NamedProvider("first"));
        api.register_provider(NamedProvider("second"));

        let provider = api.current_provider().unwrap();
        assert_eq!(provider.metadata().name, "second");
    }

    #[test]
    fn test_clear_provider() {
        let api = FlagApi::new();
        api.register_provider(NamedProvider("only"));

        let removed = api.clear_provider().unwrap();
        assert_eq!(removed.metadata().name, "only");
        assert!(api.current_provider().is_none());
    }

    #[tokio::test]
    async fn test_existing_client_sees_swapped_provider() {
        let api = FlagApi::new();
        let client = api.client("app");

        api.register_provider(NamedProvider("old"));
        assert_eq!(client.get_string_value("flag", "x", None).await, "old");

        api.register_provider(NamedProvider("new"));
        assert_eq!(client.get_string_value("flag", "x", None).await, "new");
    }

    #[test]
    fn test_global_context() {
        let api = FlagApi::new();
        assert!(api.evaluation_context().is_empty());

        api.set_evaluation_context(EvaluationContext::builder().set("env", "prod").build());
        assert_eq!(
            api.evaluation_context().get("env"),
            Some(&Value::from("prod"))
        );
    }
}
