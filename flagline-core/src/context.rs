//! Evaluation context (subject attributes)

use crate::value::Value;
use std::sync::Arc;

/// Attribute name that refers to the targeting key in targeting conditions.
pub const TARGETING_KEY: &str = "targetingKey";

/// Immutable attributes describing the subject of an evaluation.
///
/// Attributes keep insertion order. Cloning is cheap: the attribute list is
/// shared, so a context can be reused across concurrent evaluations.
///
/// # Examples
///
/// ```
/// use flagline_core::{EvaluationContext, Value};
///
/// let context = EvaluationContext::builder()
///     .targeting_key("user-123")
///     .set("email", "user@example.com")
///     .set("age", 30)
///     .build();
///
/// assert_eq!(context.targeting_key(), Some("user-123"));
/// assert_eq!(context.get("age"), Some(&Value::Integer(30)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    targeting_key: Option<String>,
    attributes: Arc<Vec<(String, Value)>>,
}

impl EvaluationContext {
    /// Context with no attributes and no targeting key.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> EvaluationContextBuilder {
        EvaluationContextBuilder::default()
    }

    /// Start a builder pre-populated with this context.
    pub fn to_builder(&self) -> EvaluationContextBuilder {
        EvaluationContextBuilder {
            targeting_key: self.targeting_key.clone(),
            attributes: self.attributes.as_ref().clone(),
        }
    }

    pub fn targeting_key(&self) -> Option<&str> {
        self.targeting_key.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// True when there are no attributes and no targeting key.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.targeting_key.is_none()
    }

    /// Merge `other` over `self`.
    ///
    /// Attributes from `other` replace attributes of the same name; the
    /// targeting key of `other` wins when it has one. Neither input changes.
    pub fn merge(&self, other: &EvaluationContext) -> EvaluationContext {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }

        let mut builder = self.to_builder();
        for (name, value) in other.attributes.iter() {
            builder = builder.set(name.clone(), value.clone());
        }
        if let Some(key) = &other.targeting_key {
            builder = builder.targeting_key(key.clone());
        }
        builder.build()
    }
}

/// Contexts are equal when they hold the same targeting key and the same
/// attributes, regardless of insertion order.
impl PartialEq for EvaluationContext {
    fn eq(&self, other: &Self) -> bool {
        self.targeting_key == other.targeting_key
            && self.len() == other.len()
            && self
                .iter()
                .all(|(name, value)| other.get(name) == Some(value))
    }
}

/// Accumulating builder for [`EvaluationContext`].
#[derive(Debug, Clone, Default)]
pub struct EvaluationContextBuilder {
    targeting_key: Option<String>,
    attributes: Vec<(String, Value)>,
}

impl EvaluationContextBuilder {
    pub fn targeting_key(mut self, key: impl Into<String>) -> Self {
        self.targeting_key = Some(key.into());
        self
    }

    /// Set an attribute. A later call with the same name overwrites the value
    /// and keeps the attribute's original position.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();

        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    pub fn build(self) -> EvaluationContext {
        EvaluationContext {
            targeting_key: self.targeting_key,
            attributes: Arc::new(self.attributes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context() {
        let context = EvaluationContext::empty();
        assert!(context.is_empty());
        assert_eq!(context.len(), 0);
        assert!(context.targeting_key().is_none());
        assert_eq!(context, EvaluationContext::default());
    }

    #[test]
    fn test_last_write_wins() {
        let context = EvaluationContext::builder()
            .set("a", 1)
            .set("b", "x")
            .set("a", 2)
            .build();

        assert_eq!(context.get("a"), Some(&Value::Integer(2)));
        assert_eq!(context.len(), 2);

        let names: Vec<&str> = context.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_merge_last_source_wins() {
        let global = EvaluationContext::builder()
            .targeting_key("global")
            .set("region", "eu")
            .set("tier", "free")
            .build();
        let invocation = EvaluationContext::builder()
            .set("tier", "pro")
            .set("beta", true)
            .build();

        let merged = global.merge(&invocation);

        assert_eq!(merged.get("region"), Some(&Value::from("eu")));
        assert_eq!(merged.get("tier"), Some(&Value::from("pro")));
        assert_eq!(merged.get("beta"), Some(&Value::Boolean(true)));
        assert_eq!(merged.targeting_key(), Some("global"));

        // Inputs are untouched
        assert_eq!(global.get("tier"), Some(&Value::from("free")));
        assert!(!invocation.contains("region"));
    }

    #[test]
    fn test_merge_targeting_key_override() {
        let base = EvaluationContext::builder().targeting_key("a").build();
        let call = EvaluationContext::builder().targeting_key("b").build();

        assert_eq!(base.merge(&call).targeting_key(), Some("b"));
        assert_eq!(call.merge(&EvaluationContext::empty()).targeting_key(), Some("b"));
    }

    #[test]
    fn test_merge_is_associative() {
        let a = EvaluationContext::builder().set("x", 1).set("y", 1).build();
        let b = EvaluationContext::builder().set("y", 2).set("z", 2).build();
        let c = EvaluationContext::builder().set("z", 3).targeting_key("c").build();

        assert_eq!(a.merge(&b).merge(&c), a.merge(&b.merge(&c)));
    }

    #[test]
    fn test_clone_shares_attributes() {
        let context = EvaluationContext::builder().set("k", "v").build();
        let copy = context.clone();
        assert!(Arc::ptr_eq(&context.attributes, &copy.attributes));
    }

    #[test]
    fn test_equality_ignores_insertion_order() {
        let forward = EvaluationContext::builder().set("a", 1).set("b", 2).build();
        let reverse = EvaluationContext::builder().set("b", 2).set("a", 1).build();
        assert_eq!(forward, reverse);

        let different = EvaluationContext::builder().set("a", 1).set("b", 3).build();
        assert_ne!(forward, different);

        let keyed = forward.to_builder().targeting_key("user").build();
        assert_ne!(forward, keyed);
    }
}
