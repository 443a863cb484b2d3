//! Flag Definitions
//!
//! Defines flags, targeting rules, rollouts and the evaluation logic that
//! selects a variant for a context.

use flagline_core::{
    ErrorCode, EvaluationContext, FlagMetadata, FlagMetadataValue, ProviderError,
    ProviderResult, Reason, TARGETING_KEY, Value,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Whether a flag is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlagState {
    #[default]
    Enabled,
    Disabled,
}

/// A flag: named variants plus the rules selecting between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagDefinition {
    #[serde(default)]
    pub state: FlagState,

    /// Variant name to value
    pub variants: BTreeMap<String, Value>,

    /// Variant served when no rule or rollout applies
    pub default_variant: String,

    /// Targeting rules, first match wins
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targeting: Vec<TargetingRule>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollout: Option<Rollout>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: FlagMetadata,
}

/// Variant chosen by [`FlagDefinition::evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<'a> {
    pub variant: &'a str,
    pub value: &'a Value,
    pub reason: Reason,
}

impl FlagDefinition {
    /// Create a flag serving `default_variant` until variants and rules are added.
    pub fn new(default_variant: impl Into<String>) -> Self {
        Self {
            state: FlagState::Enabled,
            variants: BTreeMap::new(),
            default_variant: default_variant.into(),
            targeting: Vec::new(),
            rollout: None,
            metadata: FlagMetadata::new(),
        }
    }

    /// Boolean flag with `on`/`off` variants.
    ///
    /// # Examples
    ///
    /// ```
    /// use flagline_memory::FlagDefinition;
    ///
    /// let flag = FlagDefinition::boolean(true);
    /// assert_eq!(flag.default_variant, "on");
    /// ```
    pub fn boolean(default_value: bool) -> Self {
        Self::new(if default_value { "on" } else { "off" })
            .with_variant("on", true)
            .with_variant("off", false)
    }

    pub fn with_variant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variants.insert(name.into(), value.into());
        self
    }

    pub fn with_rule(mut self, rule: TargetingRule) -> Self {
        self.targeting.push(rule);
        self
    }

    pub fn with_rollout(mut self, rollout: Rollout) -> Self {
        self.rollout = Some(rollout);
        self
    }

    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<FlagMetadataValue>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.state = FlagState::Disabled;
        self
    }

    /// Variant names referenced by the default, rules and rollout.
    pub fn referenced_variants(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.default_variant.as_str())
            .chain(self.targeting.iter().map(|rule| rule.variant.as_str()))
            .chain(self.rollout.iter().map(|rollout| rollout.variant.as_str()))
    }

    /// Check that every referenced variant exists and the rollout is in range.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(missing) = self
            .referenced_variants()
            .find(|name| !self.variants.contains_key(*name))
        {
            return Err(format!("unknown variant '{}'", missing));
        }

        if let Some(rollout) = &self.rollout
            && rollout.percentage > 100
        {
            return Err(format!(
                "rollout percentage {} exceeds 100",
                rollout.percentage
            ));
        }

        Ok(())
    }

    /// Select a variant for a context.
    ///
    /// Returns `Ok(None)` when the flag is disabled.
    pub fn evaluate(
        &self,
        flag_key: &str,
        context: &EvaluationContext,
    ) -> ProviderResult<Option<Selection<'_>>> {
        if self.state == FlagState::Disabled {
            return Ok(None);
        }

        // Check targeting rules in order
        for rule in &self.targeting {
            if rule.matches(context)? {
                return self.select(&rule.variant, Reason::TargetingMatch).map(Some);
            }
        }

        if let Some(ref rollout) = self.rollout
            && rollout.includes(context, flag_key)?
        {
            return self.select(&rollout.variant, Reason::Split).map(Some);
        }

        self.select(&self.default_variant, Reason::Static).map(Some)
    }

    fn select<'a>(&'a self, variant: &'a str, reason: Reason) -> ProviderResult<Selection<'a>> {
        let value = self.variants.get(variant).ok_or_else(|| {
            ProviderError::with_message(
                ErrorCode::ParseError,
                format!("variant '{}' is not defined", variant),
            )
        })?;

        Ok(Selection {
            variant,
            value,
            reason,
        })
    }
}

/// Targeting rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetingRule {
    /// Rule conditions (all must match)
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Variant to serve if the rule matches
    pub variant: String,
}

impl TargetingRule {
    pub fn new(variant: impl Into<String>) -> Self {
        Self {
            conditions: Vec::new(),
            variant: variant.into(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn matches(&self, context: &EvaluationContext) -> ProviderResult<bool> {
        for condition in &self.conditions {
            if !condition.matches(context)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Targeting condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Context attribute to check; `targetingKey` refers to the targeting key
    pub attribute: String,

    pub operator: Operator,

    /// Values to compare against
    pub values: Vec<Value>,
}

impl Condition {
    pub fn new(attribute: impl Into<String>, operator: Operator, values: Vec<Value>) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            values,
        }
    }

    /// Shorthand for an `Equals` condition against one value.
    pub fn equals(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(attribute, Operator::Equals, vec![value.into()])
    }

    pub fn matches(&self, context: &EvaluationContext) -> ProviderResult<bool> {
        let attr_value = lookup(context, &self.attribute);

        let Some(attr_value) = attr_value else {
            return Ok(matches!(self.operator, Operator::NotEquals | Operator::NotIn));
        };

        if attr_value.is_structured() {
            return Err(ProviderError::with_message(
                ErrorCode::InvalidContext,
                format!(
                    "attribute '{}' is a {} and cannot be used for targeting",
                    self.attribute,
                    attr_value.kind()
                ),
            ));
        }

        let first = self.values.first();
        let matched = match self.operator {
            Operator::Equals => first.is_some_and(|v| values_equal(&attr_value, v)),
            Operator::NotEquals => !first.is_some_and(|v| values_equal(&attr_value, v)),
            Operator::In => self.values.iter().any(|v| values_equal(&attr_value, v)),
            Operator::NotIn => !self.values.iter().any(|v| values_equal(&attr_value, v)),
            Operator::Contains => self.any_str(&attr_value, |attr, val| attr.contains(val)),
            Operator::StartsWith => self.any_str(&attr_value, |attr, val| attr.starts_with(val)),
            Operator::EndsWith => self.any_str(&attr_value, |attr, val| attr.ends_with(val)),
            Operator::GreaterThan => compare(&attr_value, first).is_some_and(|o| o.is_gt()),
            Operator::GreaterOrEqual => compare(&attr_value, first).is_some_and(|o| o.is_ge()),
            Operator::LessThan => compare(&attr_value, first).is_some_and(|o| o.is_lt()),
            Operator::LessOrEqual => compare(&attr_value, first).is_some_and(|o| o.is_le()),
        };

        Ok(matched)
    }

    fn any_str(&self, attr_value: &Value, op: impl Fn(&str, &str) -> bool) -> bool {
        let Ok(attr) = attr_value.as_str() else {
            return false;
        };
        self.values
            .iter()
            .filter_map(|v| v.as_str().ok())
            .any(|val| op(attr, val))
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
}

/// Gradual rollout configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rollout {
    /// Percentage (0-100)
    pub percentage: u8,

    /// Variant to serve to included subjects
    pub variant: String,

    /// Attribute to use for bucketing (default: targeting key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_by: Option<String>,

    /// Fail with `TARGETING_KEY_MISSING` instead of skipping the rollout
    #[serde(default)]
    pub require_targeting_key: bool,
}

impl Rollout {
    pub fn new(percentage: u8, variant: impl Into<String>) -> Self {
        Self {
            percentage: percentage.min(100),
            variant: variant.into(),
            bucket_by: None,
            require_targeting_key: false,
        }
    }

    pub fn with_bucket_by(mut self, attribute: impl Into<String>) -> Self {
        self.bucket_by = Some(attribute.into());
        self
    }

    pub fn require_targeting_key(mut self) -> Self {
        self.require_targeting_key = true;
        self
    }

    /// Whether the subject described by `context` falls inside the rollout.
    pub fn includes(&self, context: &EvaluationContext, flag_key: &str) -> ProviderResult<bool> {
        if self.require_targeting_key && context.targeting_key().is_none() {
            return Err(ProviderError::with_message(
                ErrorCode::TargetingKeyMissing,
                format!("flag '{}' rolls out by targeting key", flag_key),
            ));
        }

        let bucket_attr = self.bucket_by.as_deref().unwrap_or(TARGETING_KEY);
        let Some(bucket_value) = lookup(context, bucket_attr) else {
            return Ok(false);
        };

        let bucket = Self::calculate_bucket(flag_key, &bucket_value.to_string());
        Ok(bucket < self.percentage)
    }

    fn calculate_bucket(flag_key: &str, value: &str) -> u8 {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(flag_key.as_bytes());
        hasher.update(value.as_bytes());
        let result = hasher.finalize();

        // First byte (0-255) mapped to 0-99
        ((result[0] as u16 * 100) / 256) as u8
    }
}

fn lookup<'a>(context: &'a EvaluationContext, attribute: &str) -> Option<Cow<'a, Value>> {
    if attribute == TARGETING_KEY {
        return context
            .targeting_key()
            .map(|key| Cow::Owned(Value::from(key)));
    }
    context.get(attribute).map(Cow::Borrowed)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Double(d) => Some(*d),
        _ => None,
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (a, b) => match (as_number(a), as_number(b)) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
    }
}

fn compare(left: &Value, right: Option<&Value>) -> Option<std::cmp::Ordering> {
    match (left, right?) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (a, b) => as_number(a)?.partial_cmp(&as_number(b)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> EvaluationContext {
        EvaluationContext::builder().targeting_key(id).build()
    }

    #[test]
    fn test_boolean_flag() {
        let flag = FlagDefinition::boolean(true);
        let selection = flag.evaluate("test-flag", &user("user-1")).unwrap().unwrap();

        assert_eq!(selection.variant, "on");
        assert_eq!(selection.value, &Value::Boolean(true));
        assert_eq!(selection.reason, Reason::Static);
    }

    #[test]
    fn test_disabled_flag() {
        let flag = FlagDefinition::boolean(true).disabled();
        assert!(flag.evaluate("test-flag", &user("user-1")).unwrap().is_none());
    }

    #[test]
    fn test_targeting_rule() {
        let rule = TargetingRule::new("on").with_condition(Condition::new(
            "email",
            Operator::EndsWith,
            vec![Value::from("@example.com")],
        ));
        let flag = FlagDefinition::boolean(false).with_rule(rule);

        let context = EvaluationContext::builder()
            .targeting_key("user-1")
            .set("email", "user@example.com")
            .build();
        let selection = flag.evaluate("test-flag", &context).unwrap().unwrap();
        assert_eq!(selection.value, &Value::Boolean(true));
        assert_eq!(selection.reason, Reason::TargetingMatch);

        let other = flag.evaluate("test-flag", &user("user-2")).unwrap().unwrap();
        assert_eq!(other.value, &Value::Boolean(false));
        assert_eq!(other.reason, Reason::Static);
    }

    #[test]
    fn test_all_conditions_must_match() {
        let rule = TargetingRule::new("internal")
            .with_condition(Condition::equals("fn", "Sulisław"))
            .with_condition(Condition::equals("customer", false))
            .with_condition(Condition::new(
                "age",
                Operator::GreaterThan,
                vec![Value::from(22)],
            ));
        let flag = FlagDefinition::new("external")
            .with_variant("internal", "INTERNAL")
            .with_variant("external", "EXTERNAL")
            .with_rule(rule);

        let matching = EvaluationContext::builder()
            .set("fn", "Sulisław")
            .set("customer", false)
            .set("age", 29)
            .build();
        let too_young = matching.to_builder().set("age", 22).build();

        let selected = flag.evaluate("ctx", &matching).unwrap().unwrap();
        assert_eq!(selected.variant, "internal");
        let selected = flag.evaluate("ctx", &too_young).unwrap().unwrap();
        assert_eq!(selected.variant, "external");
    }

    #[test]
    fn test_operators() {
        let context = EvaluationContext::builder()
            .targeting_key("abc-123")
            .set("plan", "enterprise")
            .set("seats", 50)
            .set("score", 0.75)
            .build();

        let check = |attribute: &str, operator: Operator, values: Vec<Value>| {
            Condition::new(attribute, operator, values)
                .matches(&context)
                .unwrap()
        };

        assert!(check("plan", Operator::In, vec!["team".into(), "enterprise".into()]));
        assert!(!check("plan", Operator::NotIn, vec!["enterprise".into()]));
        assert!(check("plan", Operator::NotEquals, vec!["team".into()]));
        assert!(check("plan", Operator::Contains, vec!["terp".into()]));
        assert!(check("plan", Operator::StartsWith, vec!["ent".into()]));
        assert!(check(TARGETING_KEY, Operator::StartsWith, vec!["abc".into()]));
        assert!(check("seats", Operator::GreaterOrEqual, vec![50.into()]));
        assert!(check("seats", Operator::LessThan, vec![50.5.into()]));
        assert!(check("seats", Operator::Equals, vec![50.0.into()]));
        assert!(check("score", Operator::LessOrEqual, vec![1.into()]));
        assert!(!check("seats", Operator::GreaterThan, vec!["many".into()]));
    }

    #[test]
    fn test_missing_attribute() {
        let context = EvaluationContext::empty();

        assert!(!Condition::equals("plan", "team").matches(&context).unwrap());
        assert!(
            Condition::new("plan", Operator::NotIn, vec!["team".into()])
                .matches(&context)
                .unwrap()
        );
    }

    #[test]
    fn test_structured_attribute_is_invalid_context() {
        let context = EvaluationContext::builder()
            .set("address", Value::structure().field("city", "Oslo").build())
            .build();

        let err = Condition::equals("address", "Oslo")
            .matches(&context)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidContext);
    }

    #[test]
    fn test_rollout() {
        let rollout = Rollout::new(50, "on");
        let flag = FlagDefinition::boolean(false).with_rollout(rollout);

        let mut enabled_count = 0;
        for i in 0..100 {
            let selection = flag
                .evaluate("test-flag", &user(&format!("user-{}", i)))
                .unwrap()
                .unwrap();
            if selection.reason == Reason::Split {
                assert_eq!(selection.value, &Value::Boolean(true));
                enabled_count += 1;
            }
        }

        // Should be close to 50%
        assert!((30..=70).contains(&enabled_count));
    }

    #[test]
    fn test_rollout_is_deterministic() {
        let flag = FlagDefinition::boolean(false).with_rollout(Rollout::new(50, "on"));
        let context = user("stable-user");

        let first = flag.evaluate("f", &context).unwrap().unwrap().variant;
        for _ in 0..10 {
            assert_eq!(flag.evaluate("f", &context).unwrap().unwrap().variant, first);
        }
    }

    #[test]
    fn test_rollout_bounds() {
        let everyone = FlagDefinition::boolean(false).with_rollout(Rollout::new(100, "on"));
        let nobody = FlagDefinition::boolean(false).with_rollout(Rollout::new(0, "on"));

        assert_eq!(Rollout::new(250, "on").percentage, 100);
        for i in 0..20 {
            let context = user(&format!("u{}", i));
            assert_eq!(
                everyone.evaluate("f", &context).unwrap().unwrap().reason,
                Reason::Split
            );
            assert_eq!(
                nobody.evaluate("f", &context).unwrap().unwrap().reason,
                Reason::Static
            );
        }
    }

    #[test]
    fn test_rollout_without_bucket_value_is_skipped() {
        let flag = FlagDefinition::boolean(false).with_rollout(Rollout::new(100, "on"));
        let selection = flag
            .evaluate("f", &EvaluationContext::empty())
            .unwrap()
            .unwrap();
        assert_eq!(selection.reason, Reason::Static);
    }

    #[test]
    fn test_rollout_requiring_targeting_key() {
        let flag = FlagDefinition::boolean(false)
            .with_rollout(Rollout::new(100, "on").require_targeting_key());

        let err = flag.evaluate("f", &EvaluationContext::empty()).unwrap_err();
        assert_eq!(err.code, ErrorCode::TargetingKeyMissing);
    }

    #[test]
    fn test_rollout_bucket_by_attribute() {
        let flag = FlagDefinition::boolean(false)
            .with_rollout(Rollout::new(100, "on").with_bucket_by("email"));
        let context = EvaluationContext::builder().set("email", "a@b.c").build();

        let selection = flag.evaluate("f", &context).unwrap().unwrap();
        assert_eq!(selection.reason, Reason::Split);
    }

    #[test]
    fn test_validate() {
        assert!(FlagDefinition::boolean(true).validate().is_ok());

        let missing_default = FlagDefinition::new("nope").with_variant("on", true);
        assert_eq!(
            missing_default.validate().unwrap_err(),
            "unknown variant 'nope'"
        );

        let bad_rule = FlagDefinition::boolean(true).with_rule(TargetingRule::new("maybe"));
        assert!(bad_rule.validate().is_err());

        let mut bad_rollout = FlagDefinition::boolean(true).with_rollout(Rollout::new(10, "on"));
        if let Some(rollout) = bad_rollout.rollout.as_mut() {
            rollout.percentage = 101;
        }
        assert!(bad_rollout.validate().is_err());
    }

    #[test]
    fn test_undefined_variant_is_parse_error() {
        let flag = FlagDefinition::new("ghost");
        let err = flag.evaluate("f", &EvaluationContext::empty()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ParseError);
    }
}
