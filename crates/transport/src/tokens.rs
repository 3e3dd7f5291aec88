//! Token storage and bearer-token handling.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use formbind_core::config::ApiConfig;
use formbind_core::path::resolve_string;
use formbind_core::FormConfig;
use serde_json::Value;

use crate::request::RequestConfig;

/// External key-value store holding persisted tokens.
pub trait TokenStore: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: &str);
    fn remove(&self, name: &str);
}

/// Process-local [`TokenStore`].
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(name: &str, value: &str) -> Self {
        let store = Self::new();
        store.set(name, value);
        store
    }
}

impl TokenStore for InMemoryTokenStore {
    fn get(&self, name: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }

    fn set(&self, name: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.to_string(), value.to_string());
    }

    fn remove(&self, name: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(name);
    }
}

/// Reads, stores and clears the bearer token.
///
/// Form-level `tokenKey`/`tokenName` take priority over the API defaults.
#[derive(Clone)]
pub struct TokenManager {
    store: Arc<dyn TokenStore>,
    token_key: Option<String>,
    token_name: Option<String>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn TokenStore>, api: &ApiConfig) -> Self {
        Self {
            store,
            token_key: api.token_key.clone(),
            token_name: api.token_name.clone(),
        }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn token_name(&self, form: Option<&FormConfig>) -> Option<String> {
        form.and_then(|f| f.token_name.clone())
            .or_else(|| self.token_name.clone())
            .filter(|name| !name.is_empty())
    }

    fn token_key(&self, form: Option<&FormConfig>) -> Option<String> {
        form.and_then(|f| f.token_key.clone())
            .or_else(|| self.token_key.clone())
            .filter(|key| !key.is_empty())
    }

    /// Add `Authorization: Bearer <token>`. A literal token key wins over
    /// the stored token; nothing is added when neither exists.
    pub fn add_auth_header(&self, request: &mut RequestConfig) {
        let form = request.form.as_deref();
        let token = self
            .token_key(form)
            .or_else(|| self.token_name(form).and_then(|name| self.store.get(&name)));
        if let Some(token) = token {
            request
                .headers
                .insert("Authorization".to_string(), format!("Bearer {token}"));
        }
    }

    /// Clear the stored token when `clear_token` is set; otherwise store the
    /// value found at the token-name path of `body`, if any.
    pub fn process_token_response(&self, form: Option<&FormConfig>, clear_token: bool, body: &Value) {
        let Some(name) = self.token_name(form) else {
            return;
        };
        if clear_token {
            tracing::debug!(token = %name, "Clearing stored token");
            self.store.remove(&name);
            return;
        }
        if let Some(token) = resolve_string(body, &name).filter(|t| !t.is_empty()) {
            tracing::debug!(token = %name, "Storing token from response");
            self.store.set(&name, &token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manager(store: Arc<InMemoryTokenStore>) -> TokenManager {
        TokenManager::new(store, &ApiConfig::default())
    }

    #[test]
    fn stored_token_becomes_bearer_header() {
        let store = Arc::new(InMemoryTokenStore::with_token("token", "abc"));
        let mut request = RequestConfig::new("GET", "/me");
        manager(store).add_auth_header(&mut request);
        assert_eq!(request.header("Authorization"), Some("Bearer abc"));
    }

    #[test]
    fn literal_token_key_wins() {
        let store = Arc::new(InMemoryTokenStore::with_token("token", "stored"));
        let mut api = ApiConfig::default();
        api.token_key = Some("literal".into());
        let mut request = RequestConfig::new("GET", "/me");
        TokenManager::new(store, &api).add_auth_header(&mut request);
        assert_eq!(request.header("Authorization"), Some("Bearer literal"));
    }

    #[test]
    fn no_token_no_header() {
        let mut request = RequestConfig::new("GET", "/me");
        manager(Arc::new(InMemoryTokenStore::new())).add_auth_header(&mut request);
        assert!(!request.has_header("Authorization"));
    }

    #[test]
    fn form_token_name_overrides_api_default() {
        let store = Arc::new(InMemoryTokenStore::with_token("session", "s1"));
        let form: FormConfig = serde_json::from_value(json!({
            "selector": "#f",
            "tokenName": "session"
        }))
        .unwrap();
        let mut request = RequestConfig::new("GET", "/me").with_form(Arc::new(form));
        manager(store).add_auth_header(&mut request);
        assert_eq!(request.header("Authorization"), Some("Bearer s1"));
    }

    #[test]
    fn token_is_read_from_dotted_response_path() {
        let store = Arc::new(InMemoryTokenStore::new());
        let mut api = ApiConfig::default();
        api.token_name = Some("data.auth.access_token".into());
        let tokens = TokenManager::new(store.clone(), &api);
        tokens.process_token_response(
            None,
            false,
            &json!({"data": {"auth": {"access_token": "jwt"}}}),
        );
        assert_eq!(store.get("data.auth.access_token").as_deref(), Some("jwt"));
    }

    #[test]
    fn clear_token_removes_entry() {
        let store = Arc::new(InMemoryTokenStore::with_token("token", "abc"));
        manager(store.clone()).process_token_response(None, true, &json!({"token": "new"}));
        assert_eq!(store.get("token"), None);
    }

    #[test]
    fn body_without_token_leaves_store_alone() {
        let store = Arc::new(InMemoryTokenStore::with_token("token", "abc"));
        manager(store.clone()).process_token_response(None, false, &json!({"ok": true}));
        assert_eq!(store.get("token").as_deref(), Some("abc"));
    }
}
