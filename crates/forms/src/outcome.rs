//! Outcome policy resolution for finished submissions.
//!
//! Each setting is resolved through a priority chain, first defined wins:
//!
//! | Setting           | Success                                                  | Failure                                                                 |
//! |-------------------|----------------------------------------------------------|-------------------------------------------------------------------------|
//! | message           | body `message` > action > API > fallback                 | action[status] > action > API[status] > API                             |
//! | redirect          | action > API                                             | action[status] > action > API[status] > API                             |
//! | `preventRedirect` | action > form > API success > API > `false`              | action[status] > action > form > API[status] > API errors > API > `false` |
//! | `clearToken`      | action > form > `false`                                  | action[status] > action > form > API[status] > API > status is 401      |

use formbind_core::config::{ApiConfig, OutcomePolicy};
use formbind_core::validation::ValidationErrorMap;
use formbind_core::FormConfig;
use indexmap::IndexMap;
use serde_json::Value;

use crate::notify::NotifyKind;

pub const SUCCESS_FALLBACK: &str = "The request completed successfully.";

/// The effective policy for one outcome.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedOutcome {
    pub message: Option<String>,
    pub redirect: Option<String>,
    pub prevent_redirect: bool,
    pub clear_token: bool,
}

impl ResolvedOutcome {
    /// The redirect target, unless redirects are prevented.
    pub fn redirect_target(&self) -> Option<&str> {
        if self.prevent_redirect {
            return None;
        }
        self.redirect.as_deref().filter(|r| !r.is_empty())
    }
}

pub fn resolve_success(form: &FormConfig, api: &ApiConfig, body: &Value) -> ResolvedOutcome {
    let action = &form.actions.success;
    let body_message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);

    let message = body_message
        .or_else(|| action.message.clone())
        .or_else(|| api.success.message.clone())
        .unwrap_or_else(|| SUCCESS_FALLBACK.to_string());

    ResolvedOutcome {
        message: Some(message),
        redirect: action.redirect.clone().or_else(|| api.success.redirect.clone()),
        prevent_redirect: [
            action.prevent_redirect,
            form.prevent_redirect,
            api.success.prevent_redirect,
        ]
        .into_iter()
        .flatten()
        .next()
        .unwrap_or(api.prevent_redirect),
        clear_token: action.clear_token.or(form.clear_token).unwrap_or(false),
    }
}

pub fn resolve_error(form: &FormConfig, api: &ApiConfig, status: Option<u16>) -> ResolvedOutcome {
    let action_status = form.actions.errors.for_status(status);
    let action = &form.actions.errors.defaults;
    let api_status = api.errors.for_status(status);
    let api_defaults = &api.errors.defaults;

    let layers: [Option<&OutcomePolicy>; 4] =
        [action_status, Some(action), api_status, Some(api_defaults)];
    let flag = |get: fn(&OutcomePolicy) -> Option<bool>, form_level: Option<bool>| {
        [
            action_status.and_then(get),
            get(action),
            form_level,
            api_status.and_then(get),
            get(api_defaults),
        ]
        .into_iter()
        .flatten()
        .next()
    };

    ResolvedOutcome {
        message: layers.iter().flatten().find_map(|p| p.message.clone()),
        redirect: layers.iter().flatten().find_map(|p| p.redirect.clone()),
        prevent_redirect: flag(|p| p.prevent_redirect, form.prevent_redirect)
            .unwrap_or(api.prevent_redirect),
        clear_token: flag(|p| p.clear_token, form.clear_token).unwrap_or(status == Some(401)),
    }
}

// ---------------------------------------------------------------------------
// Fallbacks
// ---------------------------------------------------------------------------

/// What to show for a failure when no configured message resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackNotice {
    Message { kind: NotifyKind, text: String },
    /// Server-side validation failure (422) listing field errors.
    FieldErrors(IndexMap<String, Vec<String>>),
}

pub fn fallback_notice(status: Option<u16>, body: Option<&Value>) -> FallbackNotice {
    let body_message = body
        .and_then(|b| b.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let message = |kind, default: &str| FallbackNotice::Message {
        kind,
        text: body_message.clone().unwrap_or_else(|| default.to_string()),
    };
    let fixed = |kind, text: &str| FallbackNotice::Message {
        kind,
        text: text.to_string(),
    };

    match status {
        Some(400) => message(NotifyKind::Warning, "Bad request"),
        Some(401) => message(NotifyKind::Error, "Session expired"),
        Some(403) => message(NotifyKind::Error, "You are not authorized for this action"),
        Some(422) => FallbackNotice::FieldErrors(body.map(server_field_errors).unwrap_or_default()),
        Some(429) => fixed(NotifyKind::Warning, "Too many requests, please wait"),
        Some(500) => fixed(NotifyKind::Error, "Server error"),
        _ => fixed(NotifyKind::Error, "An error occurred"),
    }
}

/// Field errors from a server validation body: `{"errors": {field: msg | [msg]}}`.
pub fn server_field_errors(body: &Value) -> IndexMap<String, Vec<String>> {
    let Some(errors) = body.get("errors").and_then(Value::as_object) else {
        return IndexMap::new();
    };
    errors
        .iter()
        .map(|(field, messages)| {
            let messages: Vec<String> = match messages {
                Value::Array(items) => items
                    .iter()
                    .filter_map(formbind_core::path::value_to_field_string)
                    .collect(),
                other => formbind_core::path::value_to_field_string(other)
                    .into_iter()
                    .collect(),
            };
            (field.clone(), messages)
        })
        .collect()
}

/// First message per field, in the shape client-side validation produces.
pub fn first_messages(errors: &IndexMap<String, Vec<String>>) -> ValidationErrorMap {
    errors
        .iter()
        .filter_map(|(field, messages)| messages.first().map(|m| (field.clone(), m.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(value: Value) -> FormConfig {
        let mut base = json!({"selector": "#f"});
        formbind_core::merge::merge_deep(&mut base, &value);
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn success_message_prefers_response_body() {
        let f = form(json!({"actions": {"success": {"message": "OK"}}}));
        let api = ApiConfig::default();
        assert_eq!(
            resolve_success(&f, &api, &json!({"message": "Saved!"})).message.as_deref(),
            Some("Saved!")
        );
        assert_eq!(resolve_success(&f, &api, &json!({})).message.as_deref(), Some("OK"));
        assert_eq!(
            resolve_success(&form(json!({})), &api, &Value::Null).message.as_deref(),
            Some("Operation completed successfully!")
        );
    }

    #[test]
    fn success_redirect_and_prevention_chain() {
        let api = ApiConfig::default();
        let f = form(json!({"actions": {"success": {"redirect": "/x"}}}));
        assert_eq!(resolve_success(&f, &api, &Value::Null).redirect_target(), Some("/x"));

        let f = form(json!({"preventRedirect": true, "actions": {"success": {"redirect": "/x"}}}));
        assert_eq!(resolve_success(&f, &api, &Value::Null).redirect_target(), None);

        let f = form(json!({
            "preventRedirect": true,
            "actions": {"success": {"redirect": "/x", "preventRedirect": false}}
        }));
        assert_eq!(resolve_success(&f, &api, &Value::Null).redirect_target(), Some("/x"));
    }

    #[test]
    fn error_message_chain() {
        let api = ApiConfig::default();
        let f = form(json!({"actions": {"errors": {"message": "Generic", "404": {"message": "Missing"}}}}));
        assert_eq!(resolve_error(&f, &api, Some(404)).message.as_deref(), Some("Missing"));
        assert_eq!(resolve_error(&f, &api, Some(401)).message.as_deref(), Some("Generic"));

        let bare = form(json!({}));
        assert_eq!(
            resolve_error(&bare, &api, Some(401)).message.as_deref(),
            Some("Unauthorized access")
        );
        assert_eq!(
            resolve_error(&bare, &api, Some(418)).message.as_deref(),
            Some("An error occurred")
        );
    }

    #[test]
    fn unauthorized_clears_token_by_default() {
        let api = ApiConfig::default();
        assert!(resolve_error(&form(json!({})), &api, Some(401)).clear_token);
        assert!(!resolve_error(&form(json!({})), &api, Some(500)).clear_token);
        let keep = form(json!({"actions": {"errors": {"401": {"clearToken": false}}}}));
        assert!(!resolve_error(&keep, &api, Some(401)).clear_token);
    }

    #[test]
    fn error_redirect_per_status() {
        let api = ApiConfig::default();
        let f = form(json!({"actions": {"errors": {"401": {"redirect": "/login"}}}}));
        assert_eq!(resolve_error(&f, &api, Some(401)).redirect_target(), Some("/login"));
        assert_eq!(resolve_error(&f, &api, Some(500)).redirect_target(), None);
    }

    #[test]
    fn fallbacks_by_status() {
        assert_eq!(
            fallback_notice(Some(400), Some(&json!({"message": "Missing id"}))),
            FallbackNotice::Message {
                kind: NotifyKind::Warning,
                text: "Missing id".into()
            }
        );
        assert_eq!(
            fallback_notice(Some(429), None),
            FallbackNotice::Message {
                kind: NotifyKind::Warning,
                text: "Too many requests, please wait".into()
            }
        );
        assert_eq!(
            fallback_notice(None, None),
            FallbackNotice::Message {
                kind: NotifyKind::Error,
                text: "An error occurred".into()
            }
        );
    }

    #[test]
    fn server_errors_accept_strings_and_lists() {
        let body = json!({"errors": {"email": ["taken", "too long"], "name": "required"}});
        let errors = server_field_errors(&body);
        assert_eq!(errors["email"], vec!["taken".to_string(), "too long".to_string()]);
        assert_eq!(errors["name"], vec!["required".to_string()]);
        let first = first_messages(&errors);
        assert_eq!(first["email"], "taken");
        assert_eq!(
            fallback_notice(Some(422), Some(&body)),
            FallbackNotice::FieldErrors(errors)
        );
    }
}
