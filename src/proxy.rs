//! Request-rewriting proxies
//!
//! A proxy configuration readdresses a request to an intermediary origin
//! while recording where the request was originally headed. The relay proxy
//! protocol carries that information in headers:
//!
//! | Header | Value |
//! |---|---|
//! | `X-RELAY-URL` | original destination URL |
//! | `X-INCLUDE-BODY` | `true` when the relay must keep the body, even on `DELETE` |
//! | `X-BYPASS-EXPOSE-HEADERS` | `true` when the relay must not restrict exposed headers |

use url::Url;

use crate::error::ConfigError;
use crate::interceptor::Interceptor;
use crate::request::Request;

/// Header carrying the original destination of a relayed request
pub const RELAY_URL_HEADER: &str = "X-RELAY-URL";

/// Header asking the relay to keep the request body
pub const INCLUDE_BODY_HEADER: &str = "X-INCLUDE-BODY";

/// Header asking the relay to expose all response headers
pub const BYPASS_EXPOSE_HEADERS_HEADER: &str = "X-BYPASS-EXPOSE-HEADERS";

/// A proxy that rewrites requests so they reach `target_uri` instead of
/// their original destination
pub trait ProxyConfiguration: Send + Sync {
    /// Address of the proxy itself
    fn target_uri(&self) -> &Url;

    /// Readdress `request` to the proxy
    fn rewrite(&self, request: Request) -> Request;
}

/// Adapts a [`ProxyConfiguration`] to the [`Interceptor`] trait
#[derive(Debug, Clone)]
pub struct ProxyInterceptor<P> {
    config: P,
}

impl<P: ProxyConfiguration> ProxyInterceptor<P> {
    pub fn new(config: P) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &P {
        &self.config
    }
}

impl<P: ProxyConfiguration> Interceptor for ProxyInterceptor<P> {
    fn intercept(&self, request: Request) -> Request {
        self.config.rewrite(request)
    }

    fn name(&self) -> &str {
        "Proxy"
    }
}

/// Relay proxy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayProxyConfiguration {
    target_uri: Url,
    bypass_body_delete: bool,
    bypass_expose_headers: bool,
}

impl RelayProxyConfiguration {
    /// Relay requests to `target_uri` with both bypass flags off
    pub fn new(target_uri: Url) -> Self {
        Self {
            target_uri,
            bypass_body_delete: false,
            bypass_expose_headers: false,
        }
    }

    /// Parse the relay address from a string
    pub fn parse(target_uri: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(ConfigError::parse_relay_url(target_uri)?))
    }

    /// Ask the relay to keep request bodies, even for verbs that normally
    /// drop them
    pub fn bypass_body_delete(mut self, enabled: bool) -> Self {
        self.bypass_body_delete = enabled;
        self
    }

    /// Ask the relay to expose every response header
    pub fn bypass_expose_headers(mut self, enabled: bool) -> Self {
        self.bypass_expose_headers = enabled;
        self
    }

    pub fn is_bypass_body_delete(&self) -> bool {
        self.bypass_body_delete
    }

    pub fn is_bypass_expose_headers(&self) -> bool {
        self.bypass_expose_headers
    }
}

impl ProxyConfiguration for RelayProxyConfiguration {
    fn target_uri(&self) -> &Url {
        &self.target_uri
    }

    fn rewrite(&self, request: Request) -> Request {
        let original = request.uri().to_string();
        let mut request = request
            .with_uri(self.target_uri.clone())
            .with_header(RELAY_URL_HEADER, original);

        if self.bypass_body_delete {
            request = request.with_header(INCLUDE_BODY_HEADER, "true");
        }
        if self.bypass_expose_headers {
            request = request.with_header(BYPASS_EXPOSE_HEADERS_HEADER, "true");
        }

        request
    }
}
