//! Per-form configuration and outcome policies.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::merge::merged;

use super::rename_legacy_keys;

// ---------------------------------------------------------------------------
// FormConfig
// ---------------------------------------------------------------------------

/// The merged configuration describing one form.
///
/// Built once per form key from the registered template and caller
/// overrides, then immutable for the life of the bound controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormConfig {
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Run client-side validation before submitting.
    #[serde(default = "default_true")]
    pub validation: bool,
    /// Show outcomes through the notifier (`None` defers to the API default).
    #[serde(default, alias = "sweetalert2", skip_serializing_if = "Option::is_none")]
    pub notifications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prevent_redirect: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear_token: Option<bool>,
    #[serde(default)]
    pub fields: IndexMap<String, FieldConfig>,
    /// Partial overrides of the global validation display options.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub validation_options: Value,
    #[serde(default)]
    pub actions: FormActionsConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<DataSource>,
    /// Any other keys; forwarded untouched into transport requests.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

impl FormConfig {
    /// Merge `overrides` over the registered `template` (if any) and
    /// deserialize the result.
    ///
    /// Fails with [`ConfigError::MissingSelector`] when neither layer
    /// supplies a non-empty selector.
    pub fn from_layers(
        form_key: &str,
        template: Option<&Value>,
        overrides: &Value,
    ) -> Result<Self, ConfigError> {
        let mut base = template
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        rename_legacy_keys(&mut base);
        let mut overrides = overrides.clone();
        rename_legacy_keys(&mut overrides);
        let layered = merged(&base, &overrides);

        let has_selector = layered
            .get("selector")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty());
        if !has_selector {
            return Err(ConfigError::MissingSelector {
                form_key: form_key.to_string(),
            });
        }

        Ok(serde_json::from_value(layered)?)
    }

    /// `true` when both an endpoint and a method are configured.
    pub fn submits_remotely(&self) -> bool {
        self.endpoint.as_deref().is_some_and(|e| !e.is_empty())
            && self.method.as_deref().is_some_and(|m| !m.is_empty())
    }
}

/// Rule tokens and per-rule message overrides for one field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub rules: Vec<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub messages: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormActionsConfig {
    pub success: OutcomePolicy,
    /// Accepts both `errors` and the singular `error` spelling.
    #[serde(alias = "error")]
    pub errors: ErrorOutcomePolicy,
}

// ---------------------------------------------------------------------------
// Outcome policies
// ---------------------------------------------------------------------------

/// Message, redirect and token behaviour applied after a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutcomePolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prevent_redirect: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_token: Option<bool>,
}

/// An [`OutcomePolicy`] plus per-HTTP-status overrides.
///
/// On the wire this is a single object: numeric keys (`"401"`) hold the
/// per-status policies, every other key belongs to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct ErrorOutcomePolicy {
    pub defaults: OutcomePolicy,
    pub by_status: BTreeMap<u16, OutcomePolicy>,
}

impl ErrorOutcomePolicy {
    pub fn for_status(&self, status: Option<u16>) -> Option<&OutcomePolicy> {
        status.and_then(|s| self.by_status.get(&s))
    }
}

impl TryFrom<Map<String, Value>> for ErrorOutcomePolicy {
    type Error = serde_json::Error;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut defaults = Map::new();
        let mut by_status = BTreeMap::new();
        for (key, value) in map {
            match key.parse::<u16>() {
                Ok(status) => {
                    by_status.insert(status, serde_json::from_value(value)?);
                }
                Err(_) => {
                    defaults.insert(key, value);
                }
            }
        }
        Ok(Self {
            defaults: serde_json::from_value(Value::Object(defaults))?,
            by_status,
        })
    }
}

impl From<ErrorOutcomePolicy> for Map<String, Value> {
    fn from(policy: ErrorOutcomePolicy) -> Self {
        let mut map = match serde_json::to_value(policy.defaults) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for (status, entry) in policy.by_status {
            if let Ok(value) = serde_json::to_value(entry) {
                map.insert(status.to_string(), value);
            }
        }
        map
    }
}

// ---------------------------------------------------------------------------
// Remote prefill
// ---------------------------------------------------------------------------

/// Where to fetch initial form data from and how to project it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub endpoint: String,
    #[serde(default = "default_get")]
    pub method: String,
    #[serde(default)]
    pub mapping: IndexMap<String, MappingEntry>,
}

fn default_get() -> String {
    "GET".to_string()
}

/// One prefill mapping entry.
///
/// A string value maps the response path (the key) onto a form field of
/// that name. An object value targets a non-field element, the key being
/// the target name and `path` (defaulting to the key) the response path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingEntry {
    Field(String),
    Element(ElementTarget),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementTarget {
    pub selector: String,
    /// Attribute to set; `None` sets the element's text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<ValueTransform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueTransform {
    Trim,
    Uppercase,
    Lowercase,
    String,
    Json,
}

impl ValueTransform {
    /// Render a response value as element text.
    pub fn apply(self, value: &Value) -> String {
        let text = || crate::path::value_to_field_string(value).unwrap_or_default();
        match self {
            Self::Trim => text().trim().to_string(),
            Self::Uppercase => text().to_uppercase(),
            Self::Lowercase => text().to_lowercase(),
            Self::String => text(),
            Self::Json => value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn template_and_overrides_are_layered() {
        let template = json!({
            "selector": "#login",
            "method": "POST",
            "fields": {"email": {"rules": ["required", "email"]}}
        });
        let config = FormConfig::from_layers(
            "LOGIN",
            Some(&template),
            &json!({"endpoint": "/login", "fields": {"password": {"rules": ["required", "min:6"]}}}),
        )
        .unwrap();

        assert_eq!(config.selector, "#login");
        assert_eq!(config.endpoint.as_deref(), Some("/login"));
        assert!(config.validation);
        let names: Vec<&str> = config.fields.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["email", "password"]);
    }

    #[test]
    fn legacy_notifications_key_layers_over_template() {
        let template = json!({"selector": "#login", "notifications": true});
        let config =
            FormConfig::from_layers("LOGIN", Some(&template), &json!({"sweetalert2": false}))
                .unwrap();
        assert_eq!(config.notifications, Some(false));

        let template = json!({"selector": "#login", "sweetalert2": false});
        let config = FormConfig::from_layers("LOGIN", Some(&template), &Value::Null).unwrap();
        assert_eq!(config.notifications, Some(false));
    }

    #[test]
    fn missing_selector_is_fatal() {
        let err = FormConfig::from_layers("UNKNOWN", None, &json!({"endpoint": "/x"})).unwrap_err();
        assert_matches!(err, ConfigError::MissingSelector { form_key } if form_key == "UNKNOWN");
    }

    #[test]
    fn blank_selector_is_fatal() {
        let err = FormConfig::from_layers("X", None, &json!({"selector": "  "})).unwrap_err();
        assert_matches!(err, ConfigError::MissingSelector { .. });
    }

    #[test]
    fn error_policy_splits_status_keys() {
        let config = FormConfig::from_layers(
            "LOGIN",
            None,
            &json!({
                "selector": "#f",
                "actions": {"errors": {
                    "redirect": "/login",
                    "message": "Something failed",
                    "401": {"message": "Wrong credentials", "clearToken": true}
                }}
            }),
        )
        .unwrap();
        let errors = &config.actions.errors;
        assert_eq!(errors.defaults.redirect.as_deref(), Some("/login"));
        assert_eq!(errors.for_status(Some(401)).unwrap().clear_token, Some(true));
        assert!(errors.for_status(Some(500)).is_none());
        assert!(errors.for_status(None).is_none());
    }

    #[test]
    fn error_policy_round_trips_through_json() {
        let mut policy = ErrorOutcomePolicy::default();
        policy.defaults.message = Some("oops".into());
        policy.by_status.insert(
            422,
            OutcomePolicy {
                message: Some("fix the form".into()),
                ..OutcomePolicy::default()
            },
        );
        let value = serde_json::to_value(&policy).unwrap();
        assert_eq!(value, json!({"message": "oops", "422": {"message": "fix the form"}}));
    }

    #[test]
    fn unknown_keys_are_kept_in_extra() {
        let config =
            FormConfig::from_layers("K", None, &json!({"selector": "#k", "timeout": 500})).unwrap();
        assert_eq!(config.extra["timeout"], 500);
    }

    #[test]
    fn submits_remotely_needs_endpoint_and_method() {
        let mut config = FormConfig::from_layers("K", None, &json!({"selector": "#k"})).unwrap();
        assert!(!config.submits_remotely());
        config.endpoint = Some("/k".into());
        assert!(!config.submits_remotely());
        config.method = Some("POST".into());
        assert!(config.submits_remotely());
    }

    #[test]
    fn mapping_entries_are_untagged() {
        let source: DataSource = serde_json::from_value(json!({
            "endpoint": "/profile",
            "mapping": {
                "user.email": "email",
                "avatar": {"selector": "#avatar", "attribute": "src", "path": "user.avatar_url"}
            }
        }))
        .unwrap();
        assert_eq!(source.method, "GET");
        assert_matches!(&source.mapping["user.email"], MappingEntry::Field(f) if f == "email");
        assert_matches!(&source.mapping["avatar"], MappingEntry::Element(t) if t.selector == "#avatar");
    }

    #[test]
    fn transforms_render_values() {
        assert_eq!(ValueTransform::Uppercase.apply(&json!("ada")), "ADA");
        assert_eq!(ValueTransform::Trim.apply(&json!("  x ")), "x");
        assert_eq!(ValueTransform::Json.apply(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(ValueTransform::String.apply(&json!(7)), "7");
    }
}
