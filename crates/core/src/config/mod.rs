//! Application configuration: form registry, API defaults and UI defaults.
//!
//! [`AppConfig`] is constructed once at start-up and passed by reference to
//! every controller and pipeline. It is layered with [`merge_deep`]: the
//! built-in defaults, then whatever the integrator loads from JSON, then
//! runtime overrides.
//!
//! [`merge_deep`]: crate::merge::merge_deep

mod form;

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::merge::merged;
use crate::validation::messages::{MessageCatalog, MessageTemplate};

pub use form::{
    DataSource, ElementTarget, ErrorOutcomePolicy, FieldConfig, FormActionsConfig, FormConfig,
    MappingEntry, OutcomePolicy, ValueTransform,
};

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Root configuration tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Form templates keyed by form identifier (e.g. `"LOGIN"`). Kept as
    /// raw JSON so that factory-time overrides can be deep-merged on top.
    pub forms: Map<String, Value>,
    pub api: ApiConfig,
    pub ui: UiConfig,
    /// Per-rule-type message templates, some of which are functions of
    /// `(field, value)`. Text entries from `ui.validation.messages` are
    /// folded in on load.
    #[serde(skip)]
    pub messages: MessageCatalog,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            forms: Map::new(),
            api: ApiConfig::default(),
            ui: UiConfig::default(),
            messages: MessageCatalog::default(),
        }
    }
}

impl AppConfig {
    /// Build a config from a JSON tree layered over the defaults.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        Self::default().with_overrides(value)
    }

    /// Parse a JSON document layered over the defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Read and parse a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&raw)?;
        tracing::debug!(path = %path.display(), forms = config.forms.len(), "Loaded configuration");
        Ok(config)
    }

    /// Return a copy with `overrides` deep-merged on top.
    ///
    /// Function-valued message templates registered in code survive; text
    /// messages under `ui.validation.messages` replace catalog entries.
    pub fn with_overrides(&self, overrides: &Value) -> Result<Self, ConfigError> {
        let base = serde_json::to_value(self)?;
        let layered = merged(&base, &normalized_overrides(overrides));
        let mut next: AppConfig = serde_json::from_value(layered)?;
        next.messages = self.messages.clone();
        for (rule, text) in &next.ui.validation.messages {
            next.messages
                .insert(rule.clone(), MessageTemplate::Text(text.clone()));
        }
        Ok(next)
    }

    /// Register a form template under `key`, merging into any existing one.
    pub fn register_form(&mut self, key: impl Into<String>, mut template: Value) {
        rename_legacy_keys(&mut template);
        let key = key.into();
        match self.forms.get_mut(&key) {
            Some(existing) => {
                crate::merge::merge_deep(existing, &template);
            }
            None => {
                self.forms.insert(key, template);
            }
        }
    }

    /// The raw template registered under `key`, if any.
    pub fn form_template(&self, key: &str) -> Option<&Value> {
        self.forms.get(key)
    }
}

/// Older configs spell the `notifications` switch this way, at both the API
/// and the form level.
const LEGACY_NOTIFICATIONS_KEY: &str = "sweetalert2";

/// Rename a legacy `sweetalert2` key of one config object to `notifications`.
/// An explicit `notifications` key in the same object wins.
pub(crate) fn rename_legacy_keys(object: &mut Value) {
    if let Value::Object(map) = object {
        if let Some(legacy) = map.remove(LEGACY_NOTIFICATIONS_KEY) {
            if !map.contains_key("notifications") {
                map.insert("notifications".to_string(), legacy);
            }
        }
    }
}

/// `overrides` with legacy keys renamed in `api` and in every form template,
/// so the merge never holds both spellings.
fn normalized_overrides(overrides: &Value) -> Value {
    let mut overrides = overrides.clone();
    if let Some(api) = overrides.get_mut("api") {
        rename_legacy_keys(api);
    }
    if let Some(Value::Object(forms)) = overrides.get_mut("forms") {
        for template in forms.values_mut() {
            rename_legacy_keys(template);
        }
    }
    overrides
}

// ---------------------------------------------------------------------------
// ApiConfig
// ---------------------------------------------------------------------------

/// Global API defaults consumed by the transport and the outcome policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiConfig {
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub headers: IndexMap<String, String>,
    /// Request timeout in milliseconds.
    pub timeout: u64,
    /// Whether outcomes are shown through the notifier or only logged.
    #[serde(alias = "sweetalert2")]
    pub notifications: bool,
    pub prevent_redirect: bool,
    /// Literal bearer token; takes priority over `token_name`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_key: Option<String>,
    /// Token store key, doubling as a dot-path into response bodies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    pub errors: ErrorOutcomePolicy,
    pub success: OutcomePolicy,
    pub security: SecurityConfig,
    pub csrf: CsrfConfig,
    pub rate_limiting: RateLimitConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let mut headers = IndexMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());

        let mut errors = ErrorOutcomePolicy::default();
        errors.defaults.message = Some("An error occurred".to_string());
        errors.by_status.insert(
            401,
            OutcomePolicy {
                message: Some("Unauthorized access".to_string()),
                ..OutcomePolicy::default()
            },
        );
        errors.by_status.insert(
            500,
            OutcomePolicy {
                message: Some("A system error occurred".to_string()),
                ..OutcomePolicy::default()
            },
        );

        Self {
            base_url: "/api".to_string(),
            headers,
            timeout: 30_000,
            notifications: true,
            prevent_redirect: false,
            token_key: None,
            token_name: Some("token".to_string()),
            errors,
            success: OutcomePolicy {
                message: Some("Operation completed successfully!".to_string()),
                ..OutcomePolicy::default()
            },
            security: SecurityConfig::default(),
            csrf: CsrfConfig::default(),
            rate_limiting: RateLimitConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Apply environment overrides.
    ///
    /// | Env Var                   | Field      |
    /// |---------------------------|------------|
    /// | `FORMBIND_API_BASE_URL`   | `base_url` |
    /// | `FORMBIND_API_TIMEOUT_MS` | `timeout`  |
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env(&mut self) {
        if let Ok(base_url) = std::env::var("FORMBIND_API_BASE_URL") {
            if !base_url.trim().is_empty() {
                self.base_url = base_url.trim().to_string();
            }
        }
        if let Ok(raw) = std::env::var("FORMBIND_API_TIMEOUT_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.timeout = ms,
                Err(_) => {
                    tracing::warn!(value = %raw, "FORMBIND_API_TIMEOUT_MS is not a valid u64, ignoring")
                }
            }
        }
    }
}

/// Extra security headers attached to every request when enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityConfig {
    pub enable_security_headers: bool,
    pub headers: IndexMap<String, String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        let mut headers = IndexMap::new();
        headers.insert("X-XSS-Protection".to_string(), "1; mode=block".to_string());
        headers.insert(
            "Content-Security-Policy".to_string(),
            "default-src 'self'".to_string(),
        );
        headers.insert("X-Content-Type-Options".to_string(), "nosniff".to_string());
        Self {
            enable_security_headers: true,
            headers,
        }
    }
}

/// CSRF token forwarding from a named cookie into a request header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CsrfConfig {
    pub auto_detect: bool,
    pub cookie_name: String,
    pub header_name: String,
    pub refresh_on_submit: bool,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            auto_detect: true,
            cookie_name: "XSRF-TOKEN".to_string(),
            header_name: "X-XSRF-TOKEN".to_string(),
            refresh_on_submit: true,
        }
    }
}

/// Local request ceiling enforced before anything is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub strategy: RateLimitStrategy,
    pub limits: RateLimits,
    pub headers: RateLimitHeaders,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strategy: RateLimitStrategy::TokenBucket,
            limits: RateLimits::default(),
            headers: RateLimitHeaders::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateLimitStrategy {
    TokenBucket,
    FixedWindow,
    #[serde(other)]
    Unlimited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateLimits {
    pub per_minute: u32,
    pub per_hour: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            per_minute: 60,
            per_hour: 1000,
        }
    }
}

/// Names of the informational rate-limit headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateLimitHeaders {
    pub show: bool,
    pub limit: String,
    pub remaining: String,
    pub reset: String,
}

impl Default for RateLimitHeaders {
    fn default() -> Self {
        Self {
            show: true,
            limit: "X-RateLimit-Limit".to_string(),
            remaining: "X-RateLimit-Remaining".to_string(),
            reset: "X-RateLimit-Reset".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiConfig {
    pub notifications: NotificationOptions,
    pub validation: ValidationUiConfig,
}

/// Placement and timing passed through to the notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationOptions {
    pub position: String,
    /// Auto-close timer in milliseconds; also the redirect delay.
    pub timer: u64,
    pub show_confirm_button: bool,
}

impl Default for NotificationOptions {
    fn default() -> Self {
        Self {
            position: "top-end".to_string(),
            timer: 2000,
            show_confirm_button: false,
        }
    }
}

/// How field-level validation messages are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorDisplayMode {
    /// A feedback node placed after the input.
    #[default]
    Inline,
    /// A positioned transient popup next to the input.
    Popup,
}

/// Global validation display defaults and text message overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationUiConfig {
    pub show_errors: bool,
    pub error_class: String,
    pub success_class: String,
    pub error_display_mode: ErrorDisplayMode,
    pub error_color: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub messages: IndexMap<String, String>,
}

impl Default for ValidationUiConfig {
    fn default() -> Self {
        Self {
            show_errors: true,
            error_class: "is-invalid".to_string(),
            success_class: "is-valid".to_string(),
            error_display_mode: ErrorDisplayMode::Inline,
            error_color: "#dc3545".to_string(),
            messages: IndexMap::new(),
        }
    }
}

/// The effective display options for one form: the global UI defaults
/// with the form's `validationOptions` merged on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOptions {
    pub show_errors: bool,
    pub error_class: String,
    pub success_class: String,
    pub error_display_mode: ErrorDisplayMode,
    pub error_color: String,
}

impl ValidationOptions {
    pub fn resolve(ui: &ValidationUiConfig, form_overrides: &Value) -> Result<Self, ConfigError> {
        let base = serde_json::json!({
            "showErrors": ui.show_errors,
            "errorClass": ui.error_class,
            "successClass": ui.success_class,
            "errorDisplayMode": ui.error_display_mode,
            "errorColor": ui.error_color,
        });
        Ok(serde_json::from_value(merged(&base, form_overrides))?)
    }
}
