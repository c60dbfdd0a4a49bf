use std::fmt;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::request::Verb;
use crate::transport::TransportError;

/// Result type for relaytpx operations
pub type Result<T> = std::result::Result<T, Error>;

/// Diagnostic context captured when a request fails to complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Verb of the request as dispatched
    pub verb: Verb,
    /// Address the request was dispatched to, after interceptors ran
    pub url: Url,
    /// Time between dispatch start and failure
    pub elapsed: Duration,
    /// Name of the transport that carried the request
    pub transport: String,
}

impl ErrorContext {
    pub fn new(verb: Verb, url: Url, elapsed: Duration, transport: impl Into<String>) -> Self {
        Self {
            verb,
            url,
            elapsed,
            transport: transport.into(),
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} via {} after {:?}",
            self.verb, self.url, self.transport, self.elapsed
        )
    }
}

/// A request that did not complete.
///
/// HTTP error statuses are not errors; they are delivered as
/// [`Response::Error`](crate::Response::Error).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The transport did not finish within the configured timeout
    #[error("Request timed out: {cause}")]
    Timeout { cause: String, context: ErrorContext },

    /// The remote host could not be reached
    #[error("No internet connection: {cause}")]
    NoInternetConnection { cause: String, context: ErrorContext },

    /// Any other transport failure
    #[error("Unknown error: {cause}")]
    Unknown { cause: String, context: ErrorContext },
}

impl Error {
    /// Create a new timeout error
    pub fn timeout(cause: impl Into<String>, context: ErrorContext) -> Self {
        Error::Timeout {
            cause: cause.into(),
            context,
        }
    }

    /// Create a new connectivity error
    pub fn no_internet_connection(cause: impl Into<String>, context: ErrorContext) -> Self {
        Error::NoInternetConnection {
            cause: cause.into(),
            context,
        }
    }

    /// Create a new unknown error
    pub fn unknown(cause: impl Into<String>, context: ErrorContext) -> Self {
        Error::Unknown {
            cause: cause.into(),
            context,
        }
    }

    /// Translate a transport failure
    pub fn from_transport(err: TransportError, context: ErrorContext) -> Self {
        match err {
            TransportError::Timeout(cause) => Error::timeout(cause, context),
            TransportError::Connect(cause) => Error::no_internet_connection(cause, context),
            TransportError::Other(cause) => Error::unknown(cause, context),
        }
    }

    /// Human-readable cause
    pub fn cause(&self) -> &str {
        match self {
            Error::Timeout { cause, .. }
            | Error::NoInternetConnection { cause, .. }
            | Error::Unknown { cause, .. } => cause,
        }
    }

    /// Where and when the failure happened
    pub fn context(&self) -> &ErrorContext {
        match self {
            Error::Timeout { context, .. }
            | Error::NoInternetConnection { context, .. }
            | Error::Unknown { context, .. } => context,
        }
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Check if this is a connectivity error
    pub fn is_no_internet_connection(&self) -> bool {
        matches!(self, Error::NoInternetConnection { .. })
    }

    /// Check if this is an unknown error
    pub fn is_unknown(&self) -> bool {
        matches!(self, Error::Unknown { .. })
    }
}

/// Errors raised while constructing a client
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Base URL could not be parsed or cannot carry a path
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Relay proxy URL could not be parsed or cannot carry a path
    #[error("Invalid relay URL: {0}")]
    InvalidRelayUrl(String),

    /// A relay client was requested from a configuration without a relay
    #[error("No relay configured")]
    MissingRelay,

    /// Timeout must be greater than zero
    #[error("Invalid timeout: {0:?}")]
    InvalidTimeout(Duration),

    /// Underlying HTTP client could not be built
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Configuration document could not be parsed
    #[error("Configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Parse and validate a URL used as a base for requests
    pub(crate) fn parse_base_url(url: &str) -> std::result::Result<Url, Self> {
        let parsed =
            Url::parse(url).map_err(|e| ConfigError::InvalidBaseUrl(format!("{url}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUrl(format!("{url}: not a hierarchical URL")));
        }
        Ok(parsed)
    }

    /// Parse and validate a relay proxy URL
    pub(crate) fn parse_relay_url(url: &str) -> std::result::Result<Url, Self> {
        Self::parse_base_url(url).map_err(|_| ConfigError::InvalidRelayUrl(url.to_string()))
    }
}
