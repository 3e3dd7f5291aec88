//! reqwest-backed [`Transport`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use formbind_core::config::{ApiConfig, RateLimitHeaders};
use formbind_core::{FormData, PartValue};
use indexmap::IndexMap;
use reqwest::multipart;
use serde_json::Value;

use crate::error::TransportError;
use crate::interceptors::{
    BearerAuth, CookieSource, CsrfHeader, RateLimit, RequestInterceptor, SecurityHeaders,
};
use crate::rate_limit::RateLimiter;
use crate::request::{RequestConfig, Response};
use crate::tokens::TokenManager;
use crate::Transport;

/// HTTP client for the configured API.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    default_headers: IndexMap<String, String>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
    rate_limit_headers: Option<RateLimitHeaders>,
}

impl HttpTransport {
    /// A transport with no interceptors.
    pub fn new(api: &ApiConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(api.timeout))
            .build()?;
        Ok(Self::with_client(client, api))
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api: &ApiConfig) -> Self {
        let rate_limit_headers =
            (api.rate_limiting.enabled && api.rate_limiting.headers.show)
                .then(|| api.rate_limiting.headers.clone());
        Self {
            client,
            base_url: api.base_url.clone(),
            default_headers: api.headers.clone(),
            interceptors: Vec::new(),
            rate_limit_headers,
        }
    }

    /// A transport with the standard interceptor chain for `api`.
    pub fn standard(
        api: &ApiConfig,
        tokens: TokenManager,
        cookies: Arc<dyn CookieSource>,
    ) -> Result<Self, TransportError> {
        let mut transport = Self::new(api)?.with_interceptor(BearerAuth::new(tokens));
        if api.rate_limiting.enabled {
            let limiter = Arc::new(RateLimiter::new(api.rate_limiting.clone()));
            transport = transport.with_interceptor(RateLimit::new(limiter));
        }
        if api.security.enable_security_headers {
            transport = transport.with_interceptor(SecurityHeaders::new(&api.security));
        }
        if api.csrf.auto_detect {
            transport = transport.with_interceptor(CsrfHeader::new(&api.csrf, cookies));
        }
        Ok(transport)
    }

    pub fn with_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Absolute URLs pass through; anything else is joined to the base URL.
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }

    fn build(&self, request: &RequestConfig) -> Result<reqwest::RequestBuilder, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| TransportError::InvalidRequest(format!("bad method '{}'", request.method)))?;
        let multipart_body = request.data.as_ref().is_some_and(FormData::is_multipart);

        let mut builder = self.client.request(method.clone(), self.resolve_url(&request.url));
        for (name, value) in self.default_headers.iter().chain(request.headers.iter()) {
            // reqwest sets the multipart boundary itself.
            if multipart_body && name.eq_ignore_ascii_case("content-type") {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        let Some(data) = &request.data else {
            return Ok(builder);
        };
        builder = match data {
            FormData::Multipart(parts) => builder.multipart(multipart_form(parts)?),
            FormData::Plain(_) | FormData::Json(_) if method == reqwest::Method::GET => {
                builder.query(&query_pairs(&data.to_json()))
            }
            FormData::Plain(_) | FormData::Json(_) => builder.json(&data.to_json()),
        };
        Ok(builder)
    }

    fn log_rate_limit_headers(&self, headers: &IndexMap<String, String>) {
        let Some(names) = &self.rate_limit_headers else {
            return;
        };
        let find = |name: &str| {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        };
        if let Some(remaining) = find(&names.remaining) {
            tracing::debug!(
                limit = find(&names.limit).unwrap_or("?"),
                remaining,
                reset = find(&names.reset).unwrap_or("?"),
                "Server rate limit"
            );
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, mut config: RequestConfig) -> Result<Response, TransportError> {
        for interceptor in &self.interceptors {
            interceptor.intercept(&mut config)?;
        }

        tracing::debug!(method = %config.method, url = %config.url, "Sending request");
        let response = self.build(&config)?.send().await?;

        let status = response.status();
        let headers: IndexMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        self.log_rate_limit_headers(&headers);

        let body = response.text().await?;
        let data = parse_body(&body);

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), url = %config.url, "Request failed");
            return Err(TransportError::Http {
                status: status.as_u16(),
                data,
            });
        }

        Ok(Response {
            status: status.as_u16(),
            data,
            headers,
            config,
        })
    }
}

/// JSON when possible, the raw text otherwise, null when empty.
fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

fn query_pairs(data: &Value) -> Vec<(String, String)> {
    let Some(map) = data.as_object() else {
        return Vec::new();
    };
    let mut pairs = Vec::new();
    for (key, value) in map {
        match value {
            Value::Array(items) => pairs.extend(
                items
                    .iter()
                    .filter_map(formbind_core::path::value_to_field_string)
                    .map(|item| (key.clone(), item)),
            ),
            other => {
                if let Some(text) = formbind_core::path::value_to_field_string(other) {
                    pairs.push((key.clone(), text));
                }
            }
        }
    }
    pairs
}

fn multipart_form(parts: &[formbind_core::FormPart]) -> Result<multipart::Form, TransportError> {
    let mut form = multipart::Form::new();
    for part in parts {
        form = match &part.value {
            PartValue::Text(text) => form.text(part.name.clone(), text.clone()),
            PartValue::File(file) => {
                let bytes = file.content.as_deref().map(<[u8]>::to_vec).unwrap_or_default();
                let mut file_part = multipart::Part::bytes(bytes).file_name(file.name.clone());
                if let Some(mime) = &file.mime {
                    file_part = file_part
                        .mime_str(mime)
                        .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
                }
                form.part(part.name.clone(), file_part)
            }
        };
    }
    Ok(form)
}
