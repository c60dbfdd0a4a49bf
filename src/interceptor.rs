use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::request::{Headers, Request};

/// Interceptor trait for rewriting requests before they are sent
///
/// Interceptors run in registration order. Each receives the request produced
/// by the previous one and returns the request handed to the next.
pub trait Interceptor: Send + Sync {
    /// Rewrite a request before it is sent
    fn intercept(&self, request: Request) -> Request;

    /// Get the name of this interceptor
    fn name(&self) -> &str {
        "Unknown"
    }
}

/// Run `request` through `interceptors`, left to right
pub fn apply(interceptors: &[Arc<dyn Interceptor>], request: Request) -> Request {
    interceptors
        .iter()
        .fold(request, |request, interceptor| interceptor.intercept(request))
}

/// Ordered list of interceptors
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an interceptor to the end of the chain
    pub fn add<I>(mut self, interceptor: I) -> Self
    where
        I: Interceptor + 'static,
    {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Add a shared interceptor to the end of the chain
    pub fn add_shared(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Process a request through every interceptor
    pub fn apply(&self, request: Request) -> Request {
        apply(&self.interceptors, request)
    }

    /// Names of the registered interceptors, in order
    pub fn names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Get the number of interceptors in the chain
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Check if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Sets a fixed group of headers on every request
#[derive(Debug, Clone)]
pub struct HeaderInterceptor {
    headers: Headers,
}

impl HeaderInterceptor {
    pub fn new(headers: Headers) -> Self {
        Self { headers }
    }

    /// Interceptor setting a single header
    pub fn single(name: &str, value: &str) -> Self {
        Self::new(std::iter::once((name, value)).collect())
    }

    /// Interceptor setting the `User-Agent` header
    pub fn user_agent(user_agent: &str) -> Self {
        Self::single("User-Agent", user_agent)
    }
}

impl Interceptor for HeaderInterceptor {
    fn intercept(&self, request: Request) -> Request {
        request.with_headers(self.headers.iter())
    }

    fn name(&self) -> &str {
        "Headers"
    }
}

/// Authentication interceptor
#[derive(Debug, Clone)]
pub struct AuthInterceptor {
    authorization: String,
}

impl AuthInterceptor {
    /// Create an interceptor with a raw `Authorization` value
    pub fn new(authorization: impl Into<String>) -> Self {
        Self {
            authorization: authorization.into(),
        }
    }

    /// Create interceptor with bearer token
    pub fn bearer(token: &str) -> Self {
        Self::new(format!("Bearer {}", token))
    }

    /// Create interceptor with basic auth
    pub fn basic(username: &str, password: &str) -> Self {
        let credentials = format!("{}:{}", username, password);
        Self::new(format!("Basic {}", BASE64.encode(credentials.as_bytes())))
    }
}

impl Interceptor for AuthInterceptor {
    fn intercept(&self, request: Request) -> Request {
        request.with_header("Authorization", self.authorization.as_str())
    }

    fn name(&self) -> &str {
        "Authentication"
    }
}

/// Logging interceptor
pub struct LoggingInterceptor {
    level: log::Level,
    include_headers: bool,
}

impl LoggingInterceptor {
    /// Create a new logging interceptor
    pub fn new() -> Self {
        Self {
            level: log::Level::Info,
            include_headers: false,
        }
    }

    /// Set the log level
    pub fn level(mut self, level: log::Level) -> Self {
        self.level = level;
        self
    }

    /// Include headers in logs
    pub fn include_headers(mut self, include: bool) -> Self {
        self.include_headers = include;
        self
    }
}

impl Default for LoggingInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Interceptor for LoggingInterceptor {
    fn intercept(&self, request: Request) -> Request {
        log::log!(self.level, "{} {}", request.verb(), request.uri());

        if self.include_headers {
            for (name, value) in request.headers().iter() {
                log::log!(self.level, "  {}: {}", name, value);
            }
        }

        request
    }

    fn name(&self) -> &str {
        "Logging"
    }
}

/// Interceptor backed by a closure
pub struct CustomInterceptor<F> {
    rewrite: F,
    name: String,
}

impl<F> CustomInterceptor<F>
where
    F: Fn(Request) -> Request + Send + Sync + 'static,
{
    /// Create a new custom interceptor
    pub fn new(name: &str, rewrite: F) -> Self {
        Self {
            rewrite,
            name: name.to_string(),
        }
    }
}

impl<F> Interceptor for CustomInterceptor<F>
where
    F: Fn(Request) -> Request + Send + Sync + 'static,
{
    fn intercept(&self, request: Request) -> Request {
        (self.rewrite)(request)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
