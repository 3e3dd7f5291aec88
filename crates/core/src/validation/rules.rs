//! Rule tokens, rule descriptors and the rule parser.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::messages::MessageCatalog;
use crate::config::FieldConfig;

/// A parsed, message-resolved rule. Immutable once compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDescriptor {
    #[serde(rename = "type")]
    pub rule_type: String,
    /// Raw operand after the first `:`; interpreted per rule type.
    pub value: Option<String>,
    pub message: String,
}

impl RuleDescriptor {
    pub fn kind(&self) -> RuleKind {
        RuleKind::from_type(&self.rule_type)
    }

    /// The operand, or an empty string for operand-less rules.
    pub fn operand(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }
}

/// Rules for one field, in declaration order.
pub type FieldRuleSet = Vec<RuleDescriptor>;

/// Compiled rules for a whole form, in field declaration order.
pub type RuleMap = IndexMap<String, FieldRuleSet>;

/// Known rule types. Anything else is [`RuleKind::Other`] and passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Required,
    Nullable,
    Regex,
    Email,
    Url,
    Numeric,
    Integer,
    Alpha,
    AlphaNum,
    Min,
    Max,
    Between,
    Size,
    MinLength,
    MaxLength,
    In,
    NotIn,
    Same,
    Confirmed,
    Date,
    Before,
    After,
    File,
    Image,
    Mimes,
    Dimensions,
    Other,
}

impl RuleKind {
    pub fn from_type(rule_type: &str) -> Self {
        match rule_type {
            "required" => Self::Required,
            "nullable" => Self::Nullable,
            "regex" | "pattern" => Self::Regex,
            "email" => Self::Email,
            "url" => Self::Url,
            "numeric" => Self::Numeric,
            "integer" => Self::Integer,
            "alpha" => Self::Alpha,
            "alpha_num" => Self::AlphaNum,
            "min" => Self::Min,
            "max" => Self::Max,
            "between" => Self::Between,
            "size" => Self::Size,
            "minLength" => Self::MinLength,
            "maxLength" => Self::MaxLength,
            "in" => Self::In,
            "not_in" => Self::NotIn,
            "same" => Self::Same,
            "confirmed" => Self::Confirmed,
            "date" => Self::Date,
            "before" => Self::Before,
            "after" => Self::After,
            "file" => Self::File,
            "image" => Self::Image,
            "mimes" => Self::Mimes,
            "dimensions" => Self::Dimensions,
            _ => Self::Other,
        }
    }

    /// Rules judged against the field's file selection.
    pub fn is_file_bound(self) -> bool {
        matches!(self, Self::File | Self::Image | Self::Mimes | Self::Dimensions)
    }

    /// Rules that switch `min`/`max`/`between` to numeric comparison.
    pub fn is_numeric_marker(self) -> bool {
        matches!(self, Self::Numeric | Self::Integer)
    }
}

/// Parse one rule token for `field`.
///
/// The token is split on its first `:` only, so operands may contain
/// colons. The message comes from `field_messages[type]`, then the global
/// catalog (text or function of `(field, value)`), then a generic fallback.
/// Never fails; unknown types evaluate as passing.
pub fn parse_rule(
    token: &str,
    field: &str,
    field_messages: Option<&IndexMap<String, String>>,
    catalog: &MessageCatalog,
) -> RuleDescriptor {
    let (rule_type, value) = match token.split_once(':') {
        Some((rule_type, value)) => (rule_type.trim().to_string(), Some(value.to_string())),
        None => (token.trim().to_string(), None),
    };

    let message = field_messages
        .and_then(|m| m.get(&rule_type))
        .cloned()
        .or_else(|| catalog.render(&rule_type, field, value.as_deref()))
        .unwrap_or_else(|| format!("The {rule_type} rule could not be satisfied for the {field} field."));

    RuleDescriptor {
        rule_type,
        value,
        message,
    }
}

/// Compile every field that declares rules. Fields without rules are skipped.
pub fn compile_rules(fields: &IndexMap<String, FieldConfig>, catalog: &MessageCatalog) -> RuleMap {
    fields
        .iter()
        .filter(|(_, config)| !config.rules.is_empty())
        .map(|(field, config)| {
            let rules = config
                .rules
                .iter()
                .map(|token| parse_rule(token, field, Some(&config.messages), catalog))
                .collect();
            (field.clone(), rules)
        })
        .collect()
}
