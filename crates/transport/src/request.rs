//! Request and response shapes exchanged with a [`Transport`].
//!
//! [`Transport`]: crate::Transport

use std::sync::Arc;

use formbind_core::{FormConfig, FormData};
use indexmap::IndexMap;
use serde_json::Value;

/// One outgoing request.
///
/// The merged form config rides along in `form` so interceptors can read
/// token settings and outcome policy off the request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    pub url: String,
    pub method: String,
    pub data: Option<FormData>,
    pub headers: IndexMap<String, String>,
    pub form: Option<Arc<FormConfig>>,
}

impl RequestConfig {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            data: None,
            headers: IndexMap::new(),
            form: None,
        }
    }

    pub fn with_data(mut self, data: FormData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_form(mut self, form: Arc<FormConfig>) -> Self {
        self.form = Some(form);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    /// Parsed JSON body; non-JSON bodies arrive as a string, empty as null.
    pub data: Value,
    pub headers: IndexMap<String, String>,
    pub config: RequestConfig,
}

impl Response {
    pub fn new(status: u16, data: Value, config: RequestConfig) -> Self {
        Self {
            status,
            data,
            headers: IndexMap::new(),
            config,
        }
    }

    /// `message` string of the body, if any.
    pub fn message(&self) -> Option<&str> {
        self.data.get("message").and_then(Value::as_str)
    }
}
