//! The transport collaborator: the [`Transport`] contract, request
//! interceptors, token storage and a reqwest-backed implementation.

pub mod error;
pub mod http;
pub mod interceptors;
pub mod rate_limit;
pub mod request;
pub mod tokens;

use async_trait::async_trait;

pub use error::TransportError;
pub use http::HttpTransport;
pub use interceptors::{CookieJar, CookieSource, RequestInterceptor};
pub use rate_limit::RateLimiter;
pub use request::{RequestConfig, Response};
pub use tokens::{InMemoryTokenStore, TokenManager, TokenStore};

/// Performs one request. Implementations run their interceptor chain
/// first and map non-2xx answers to [`TransportError::Http`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, config: RequestConfig) -> Result<Response, TransportError>;
}
