//! Rule sets and the per-request transform context.

use std::borrow::Cow;

use serde_json::Value;

use crate::observability::metrics;
use crate::rules::key::ConfigKey;
use crate::rules::rule::{ContentRule, Rule, SchemaRule};

/// The ordered rules for one page, split by kind.
///
/// Relative order inside each partition is the order the configuration
/// service returned them in; it is also the order they are applied in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    content: Vec<ContentRule>,
    schema: Vec<SchemaRule>,
}

impl RuleSet {
    /// Build a set from already-validated rules.
    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        let mut set = Self::default();
        for rule in rules {
            set.push(rule);
        }
        set
    }

    /// Build a set from raw records, skipping the ones that fail validation.
    pub fn from_records(records: impl IntoIterator<Item = Value>) -> Self {
        let mut set = Self::default();
        for (index, record) in records.into_iter().enumerate() {
            match Rule::from_record(record) {
                Ok(rule) => set.push(rule),
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping malformed rule record");
                    metrics::record_rule_rejected();
                }
            }
        }
        set
    }

    /// Build a set from the configuration service's JSON document.
    ///
    /// Anything other than a top-level array means "no rules".
    pub fn from_document(document: Value) -> Self {
        match document {
            Value::Array(records) => Self::from_records(records),
            other => {
                tracing::debug!(kind = json_kind(&other), "Rule document is not an array");
                Self::default()
            }
        }
    }

    fn push(&mut self, rule: Rule) {
        match rule {
            Rule::ContentReplace(rule) => self.content.push(rule),
            Rule::SchemaInject(rule) => self.schema.push(rule),
        }
    }

    pub fn content_rules(&self) -> &[ContentRule] {
        &self.content
    }

    pub fn schema_rules(&self) -> &[SchemaRule] {
        &self.schema
    }

    /// True iff there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.schema.is_empty()
    }

    pub fn len(&self) -> usize {
        self.content.len() + self.schema.len()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Everything one response transformation needs, owned by a single request.
#[derive(Debug, Clone)]
pub struct TransformContext {
    key: ConfigKey,
    content_rules: Vec<ContentRule>,
    schema_rules: Vec<SchemaRule>,
}

impl TransformContext {
    pub fn new(key: ConfigKey, rules: RuleSet) -> Self {
        Self {
            key,
            content_rules: rules.content,
            schema_rules: rules.schema,
        }
    }

    /// The page key the rules were fetched for.
    pub fn key(&self) -> &ConfigKey {
        &self.key
    }

    pub fn content_rules(&self) -> &[ContentRule] {
        &self.content_rules
    }

    pub fn schema_rules(&self) -> &[SchemaRule] {
        &self.schema_rules
    }

    /// Run every content rule over `text`, each one seeing the output of the
    /// rules before it.
    pub fn apply_content_rules<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut current = Cow::Borrowed(text);
        for rule in &self.content_rules {
            if let Some(next) = rule.apply(&current) {
                current = Cow::Owned(next);
            }
        }
        current
    }

    /// Markup appended to `head`: one script per schema rule, in order.
    pub fn schema_markup(&self) -> String {
        self.schema_rules.iter().map(SchemaRule::to_markup).collect()
    }
}
