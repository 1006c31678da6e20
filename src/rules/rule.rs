//! Rule records and their validated form.
//!
//! The configuration service speaks in terse records:
//!
//! ```json
//! [
//!   {"t": "p",  "o": "SEO", "n": "<a href=\"/seo\">SEO</a>"},
//!   {"t": "li", "o": "edge", "n": "<em>edge</em>"},
//!   {"t": "s",  "o": "{\"@type\":\"Organization\"}"}
//! ]
//! ```
//!
//! `t` selects the kind, `o` is the match text (or the schema payload) and
//! `n` the replacement. Each record is turned into a [`Rule`] on its own so
//! one bad record cannot take the rest of the page down with it.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Reasons a single rule record is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    /// The record is not a JSON object with a string `t` field.
    #[error("Malformed rule record: {0}")]
    Malformed(String),

    /// The `t` field names a kind we do not know.
    #[error("Unknown rule tag '{0}'")]
    UnknownTag(String),

    /// A field required by the record's kind is absent or null.
    #[error("Rule '{tag}' is missing field '{field}'")]
    MissingField { tag: String, field: &'static str },

    /// A content rule with an empty match string would match everywhere.
    #[error("Rule '{0}' has an empty match string")]
    EmptyMatch(String),
}

/// Wire shape of a record, before validation.
#[derive(Debug, Deserialize)]
struct RuleRecord {
    t: String,
    #[serde(default)]
    o: Option<Value>,
    #[serde(default)]
    n: Option<Value>,
}

/// A validated rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Text substitution inside `p` / `li` text nodes.
    ContentReplace(ContentRule),
    /// JSON-LD script appended to `head`.
    SchemaInject(SchemaRule),
}

/// Replaces the first occurrence of `pattern` in a text node with `replacement`.
///
/// The replacement is raw markup and is written without escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRule {
    pattern: String,
    replacement: String,
}

impl ContentRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Apply the rule to `text`, returning `None` when the pattern is absent.
    pub fn apply(&self, text: &str) -> Option<String> {
        let start = text.find(&self.pattern)?;
        let end = start + self.pattern.len();

        let mut out = String::with_capacity(text.len() - self.pattern.len() + self.replacement.len());
        out.push_str(&text[..start]);
        out.push_str(&self.replacement);
        out.push_str(&text[end..]);
        Some(out)
    }
}

/// A structured-data payload to wrap in `<script type="application/ld+json">`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRule {
    payload: String,
}

impl SchemaRule {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The script element injected for this rule. The payload is not escaped.
    pub fn to_markup(&self) -> String {
        format!(r#"<script type="application/ld+json">{}</script>"#, self.payload)
    }
}

impl Rule {
    /// Validate a single JSON record.
    pub fn from_record(record: Value) -> Result<Self, RuleError> {
        let record: RuleRecord =
            serde_json::from_value(record).map_err(|e| RuleError::Malformed(e.to_string()))?;

        match record.t.as_str() {
            "p" | "li" => {
                let pattern = record
                    .o
                    .as_ref()
                    .and_then(scalar_text)
                    .ok_or_else(|| missing(&record.t, "o"))?;
                if pattern.is_empty() {
                    return Err(RuleError::EmptyMatch(record.t));
                }
                let replacement = record
                    .n
                    .as_ref()
                    .and_then(scalar_text)
                    .ok_or_else(|| missing(&record.t, "n"))?;
                Ok(Rule::ContentReplace(ContentRule::new(pattern, replacement)))
            }
            "s" => {
                let payload = record
                    .o
                    .as_ref()
                    .and_then(payload_text)
                    .ok_or_else(|| missing(&record.t, "o"))?;
                Ok(Rule::SchemaInject(SchemaRule::new(payload)))
            }
            other => Err(RuleError::UnknownTag(other.to_string())),
        }
    }
}

fn missing(tag: &str, field: &'static str) -> RuleError {
    RuleError::MissingField {
        tag: tag.to_string(),
        field,
    }
}

/// Strings, numbers and booleans all have an obvious textual form.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Schema payloads may also arrive as already-parsed JSON.
fn payload_text(value: &Value) -> Option<String> {
    match value {
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
        other => scalar_text(other),
    }
}
