//! relaytpx - an async HTTP client with classified responses and relay proxying
//!
//! Requests are issued against a configured base URL. Every call resolves to
//! exactly one of two outcomes:
//!
//! - a [`Response`], classified by status and `Content-Type` into JSON, plain
//!   text, JPEG, PNG, binary or HTTP-error variants, with the body buffered;
//! - an [`Error`] when the request did not complete: timeout, no connection,
//!   or anything else the transport reports.
//!
//! Before a request reaches the transport it passes through an ordered chain
//! of [`Interceptor`]s. A [`RelayProxyConfiguration`] is one such rewrite: it
//! readdresses the request to a relay and records the original destination
//! in the `X-RELAY-URL` header.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relaytpx::{Client, NetworkingClient, RequestOptions, Response};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder("https://httpbin.org".parse()?).build()?;
//!
//!     match client.get("get", RequestOptions::new().query("q", "rust")).await? {
//!         Response::Json(parts) => println!("Status: {}", parts.status),
//!         Response::Error { parts, .. } => println!("Failed with {}", parts.status),
//!         other => println!("Got a {} response", other.kind()),
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod content_type;
pub mod error;
pub mod interceptor;
pub mod proxy;
pub mod request;
pub mod resolve;
pub mod response;
pub mod timeout;
pub mod transport;

// Re-export main types for convenience
pub use client::{Client, ClientBuilder, NetworkingClient, RelayProxyClient};
pub use config::{ClientConfig, RelayConfig};
pub use content_type::ContentType;
pub use error::{ConfigError, Error, ErrorContext, Result};
pub use interceptor::{
    AuthInterceptor, CustomInterceptor, HeaderInterceptor, Interceptor, InterceptorChain,
    LoggingInterceptor,
};
pub use proxy::{
    ProxyConfiguration, ProxyInterceptor, RelayProxyConfiguration, BYPASS_EXPOSE_HEADERS_HEADER,
    INCLUDE_BODY_HEADER, RELAY_URL_HEADER,
};
pub use request::{Headers, Request, RequestOptions, Verb};
pub use resolve::resolve;
pub use response::{Response, ResponseParts};
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};

// Re-export common types
pub use bytes::Bytes;
pub use url::Url;

// Re-export common traits
pub use async_trait::async_trait;
