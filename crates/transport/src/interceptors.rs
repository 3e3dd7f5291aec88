//! Request interceptors applied by [`HttpTransport`] before sending.
//!
//! The standard chain runs in this order: bearer token, rate limit,
//! security headers, CSRF header.
//!
//! [`HttpTransport`]: crate::HttpTransport

use std::collections::HashMap;
use std::sync::Arc;

use formbind_core::config::{CsrfConfig, SecurityConfig};
use indexmap::IndexMap;

use crate::error::TransportError;
use crate::rate_limit::RateLimiter;
use crate::request::RequestConfig;
use crate::tokens::TokenManager;

/// A hook that may rewrite or reject an outgoing request.
pub trait RequestInterceptor: Send + Sync {
    fn intercept(&self, request: &mut RequestConfig) -> Result<(), TransportError>;
}

// ---------------------------------------------------------------------------
// Cookies
// ---------------------------------------------------------------------------

/// Read access to the host's cookies.
pub trait CookieSource: Send + Sync {
    fn cookie(&self, name: &str) -> Option<String>;
}

/// Cookies parsed from a `name=value; other=value` header string.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: HashMap<String, String>,
}

impl CookieJar {
    pub fn parse(header: &str) -> Self {
        let cookies = header
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .filter(|(name, _)| !name.is_empty())
            .collect();
        Self { cookies }
    }
}

impl CookieSource for CookieJar {
    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }
}

// ---------------------------------------------------------------------------
// Interceptors
// ---------------------------------------------------------------------------

/// Adds `Authorization: Bearer <token>`.
pub struct BearerAuth {
    tokens: TokenManager,
}

impl BearerAuth {
    pub fn new(tokens: TokenManager) -> Self {
        Self { tokens }
    }
}

impl RequestInterceptor for BearerAuth {
    fn intercept(&self, request: &mut RequestConfig) -> Result<(), TransportError> {
        self.tokens.add_auth_header(request);
        Ok(())
    }
}

/// Rejects requests beyond the configured ceiling.
pub struct RateLimit {
    limiter: Arc<RateLimiter>,
}

impl RateLimit {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl RequestInterceptor for RateLimit {
    fn intercept(&self, request: &mut RequestConfig) -> Result<(), TransportError> {
        if self.limiter.try_acquire() {
            Ok(())
        } else {
            tracing::warn!(url = %request.url, "Request rejected by rate limiter");
            Err(TransportError::RateLimited)
        }
    }
}

/// Adds the configured security headers. Headers already on the request win.
pub struct SecurityHeaders {
    headers: IndexMap<String, String>,
}

impl SecurityHeaders {
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            headers: config.headers.clone(),
        }
    }
}

impl RequestInterceptor for SecurityHeaders {
    fn intercept(&self, request: &mut RequestConfig) -> Result<(), TransportError> {
        for (name, value) in &self.headers {
            if !request.has_header(name) {
                request.headers.insert(name.clone(), value.clone());
            }
        }
        Ok(())
    }
}

/// Copies the CSRF cookie into the CSRF header when the cookie is present.
pub struct CsrfHeader {
    cookie_name: String,
    header_name: String,
    cookies: Arc<dyn CookieSource>,
}

impl CsrfHeader {
    pub fn new(config: &CsrfConfig, cookies: Arc<dyn CookieSource>) -> Self {
        Self {
            cookie_name: config.cookie_name.clone(),
            header_name: config.header_name.clone(),
            cookies,
        }
    }
}

impl RequestInterceptor for CsrfHeader {
    fn intercept(&self, request: &mut RequestConfig) -> Result<(), TransportError> {
        if let Some(token) = self.cookies.cookie(&self.cookie_name) {
            request.headers.insert(self.header_name.clone(), token);
        }
        Ok(())
    }
}
