//! Per-rule-type message templates.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A message generator taking `(field, rule_value)`.
pub type MessageFn = dyn Fn(&str, Option<&str>) -> String + Send + Sync;

/// A global message template for one rule type.
#[derive(Clone)]
pub enum MessageTemplate {
    Text(String),
    Dynamic(Arc<MessageFn>),
}

impl MessageTemplate {
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&str, Option<&str>) -> String + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(f))
    }

    pub fn render(&self, field: &str, value: Option<&str>) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Dynamic(f) => f(field, value),
        }
    }
}

impl fmt::Debug for MessageTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Message templates keyed by rule type.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    templates: HashMap<String, MessageTemplate>,
}

impl MessageCatalog {
    /// A catalog with no templates; every rule falls back to the generic message.
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    pub fn insert(&mut self, rule_type: impl Into<String>, template: MessageTemplate) {
        self.templates.insert(rule_type.into(), template);
    }

    pub fn get(&self, rule_type: &str) -> Option<&MessageTemplate> {
        self.templates.get(rule_type)
    }

    /// Render the template for `rule_type`, if one is registered.
    pub fn render(&self, rule_type: &str, field: &str, value: Option<&str>) -> Option<String> {
        self.get(rule_type).map(|t| t.render(field, value))
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        let mut catalog = Self::empty();

        catalog.insert(
            "required",
            MessageTemplate::dynamic(|field, _| {
                match field {
                    "email" => "Email address is required",
                    "password" => "Password is required",
                    "name" => "Name is required",
                    "message" => "Message is required",
                    "phone" => "Phone number is required",
                    _ => return format!("The {field} field is required"),
                }
                .to_string()
            }),
        );
        catalog.insert(
            "email",
            MessageTemplate::Text("Please enter a valid email address".to_string()),
        );
        catalog.insert(
            "url",
            MessageTemplate::Text("Please enter a valid URL".to_string()),
        );

        let with_value = |rule: &'static str, text: &'static str| {
            (
                rule,
                MessageTemplate::dynamic(move |field, value| {
                    text.replace(":field", field)
                        .replace(":value", value.unwrap_or_default())
                }),
            )
        };
        for (rule, template) in [
            with_value("min", "The :field field must be at least :value characters"),
            with_value("max", "The :field field may not be greater than :value characters"),
            with_value("minLength", "The :field field must be at least :value characters"),
            with_value("maxLength", "The :field field may not be greater than :value characters"),
            with_value("size", "The :field field must be exactly :value characters"),
            with_value("in", "The :field field must be one of: :value"),
            with_value("not_in", "The :field field may not be one of: :value"),
            with_value("same", "The :field field must match :value"),
            with_value("before", "The :field field must be a date before :value"),
            with_value("after", "The :field field must be a date after :value"),
            with_value("mimes", "The :field field must be a file of type: :value"),
        ] {
            catalog.insert(rule, template);
        }

        catalog.insert(
            "between",
            MessageTemplate::dynamic(|field, value| {
                let mut bounds = value.unwrap_or_default().splitn(2, ',');
                let low = bounds.next().unwrap_or_default().trim();
                let high = bounds.next().unwrap_or_default().trim();
                format!("The {field} field must be between {low} and {high}")
            }),
        );

        for (rule, suffix) in [
            ("numeric", "must be a number"),
            ("integer", "must be an integer"),
            ("alpha", "may only contain letters"),
            ("alpha_num", "may only contain letters and numbers"),
            ("regex", "format is invalid"),
            ("pattern", "format is invalid"),
            ("date", "is not a valid date"),
            ("confirmed", "confirmation does not match"),
            ("file", "must be a file"),
            ("image", "must be an image"),
            ("dimensions", "has invalid image dimensions"),
        ] {
            catalog.insert(
                rule,
                MessageTemplate::dynamic(move |field, _| format!("The {field} field {suffix}")),
            );
        }

        catalog
    }
}
