//! Declarative client configuration

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{ClientBuilder, NetworkingClient, RelayProxyClient};
use crate::error::ConfigError;
use crate::interceptor::HeaderInterceptor;
use crate::proxy::RelayProxyConfiguration;
use crate::request::Headers;
use crate::timeout::DEFAULT_TIMEOUT;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL endpoints are resolved against
    pub base_url: String,

    /// Request timeout
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Headers set on every request, before any other interceptor runs
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,

    /// Custom user agent
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Relay proxy every request goes through
    #[serde(default)]
    pub relay: Option<RelayConfig>,
}

/// Relay proxy settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Address of the relay
    pub target_uri: String,

    /// Send `X-INCLUDE-BODY: true`
    #[serde(default)]
    pub bypass_body_delete: bool,

    /// Send `X-BYPASS-EXPOSE-HEADERS: true`
    #[serde(default)]
    pub bypass_expose_headers: bool,
}

impl ClientConfig {
    /// Create a config with defaults for everything but the base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: default_timeout(),
            default_headers: BTreeMap::new(),
            user_agent: None,
            relay: None,
        }
    }

    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Add a default header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// Route requests through a relay
    pub fn with_relay(mut self, relay: RelayConfig) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Turn the configuration into a client builder.
    ///
    /// A configured relay is registered after the header interceptors, so
    /// interceptors added to the returned builder run after the relay rewrite.
    pub fn builder(&self) -> Result<ClientBuilder, ConfigError> {
        let builder = self.base_builder()?;
        match &self.relay {
            Some(relay) => Ok(builder.proxy(relay.to_proxy_configuration()?)),
            None => Ok(builder),
        }
    }

    /// Build a client, relaying through [`ClientConfig::relay`] when one is set
    pub fn build(&self) -> Result<Box<dyn NetworkingClient>, ConfigError> {
        match &self.relay {
            Some(_) => Ok(Box::new(self.relay_client()?)),
            None => Ok(Box::new(self.base_builder()?.build()?)),
        }
    }

    /// Build a client that relays through [`ClientConfig::relay`]
    pub fn relay_client(&self) -> Result<RelayProxyClient, ConfigError> {
        let relay = self.relay.as_ref().ok_or(ConfigError::MissingRelay)?;
        RelayProxyClient::new(self.base_builder()?, relay.to_proxy_configuration()?)
    }

    fn base_builder(&self) -> Result<ClientBuilder, ConfigError> {
        let mut builder = ClientBuilder::parse(&self.base_url)?.timeout(self.timeout);

        if !self.default_headers.is_empty() {
            let headers: Headers = self.default_headers.iter().collect();
            builder = builder.interceptor(HeaderInterceptor::new(headers));
        }
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent);
        }

        Ok(builder)
    }
}

impl RelayConfig {
    pub fn new(target_uri: impl Into<String>) -> Self {
        Self {
            target_uri: target_uri.into(),
            bypass_body_delete: false,
            bypass_expose_headers: false,
        }
    }

    /// Validate the relay address and build the rewrite
    pub fn to_proxy_configuration(&self) -> Result<RelayProxyConfiguration, ConfigError> {
        Ok(RelayProxyConfiguration::parse(&self.target_uri)?
            .bypass_body_delete(self.bypass_body_delete)
            .bypass_expose_headers(self.bypass_expose_headers))
    }
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}
