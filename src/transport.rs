use std::fmt;
use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client as ReqwestClient;
use thiserror::Error;

use crate::error::ConfigError;
use crate::request::{Headers, Request};
use crate::response::ResponseParts;

/// Failure reported by a transport.
///
/// The variants carry only what the client needs to pick an
/// [`Error`](crate::Error) variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The transport gave up waiting on its own
    #[error("{0}")]
    Timeout(String),

    /// DNS resolution, connection or socket-level failure
    #[error("{0}")]
    Connect(String),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();

        if err.is_timeout() {
            TransportError::Timeout(message)
        } else if err.is_connect() || is_connection_failure(&err) {
            TransportError::Connect(message)
        } else {
            TransportError::Other(message)
        }
    }
}

/// Walk the source chain looking for a socket-level I/O failure
fn is_connection_failure(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::AddrNotAvailable
            ) {
                return true;
            }
        }
        current = err.source();
    }
    false
}

/// Status and headers of a response whose body is still streaming
pub struct TransportResponse {
    status: u16,
    headers: Headers,
    body: BoxStream<'static, Result<Bytes, TransportError>>,
}

impl TransportResponse {
    /// Create a response with a streamed body
    pub fn new<S>(status: u16, headers: Headers, body: S) -> Self
    where
        S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
    {
        Self {
            status,
            headers,
            body: body.boxed(),
        }
    }

    /// Create a response whose body is already in memory
    pub fn full(status: u16, headers: Headers, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self::new(status, headers, stream::once(async move { Ok(body) }))
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Read the whole body into memory
    pub async fn buffer(self) -> Result<ResponseParts, TransportError> {
        let TransportResponse {
            status,
            headers,
            mut body,
        } = self;

        let mut buffered = Vec::new();
        while let Some(chunk) = body.try_next().await? {
            buffered.extend_from_slice(&chunk);
        }

        Ok(ResponseParts::new(status, headers, buffered))
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Transport trait for HTTP operations
///
/// This trait abstracts the component that puts a request on the wire, so the
/// client can be driven by something other than a real network stack.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the response head with a streaming body
    async fn send(&self, request: Request) -> Result<TransportResponse, TransportError>;

    /// Get the transport name/type
    fn name(&self) -> &str;
}

/// Default HTTP transport implementation using reqwest
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: ReqwestClient,
}

impl HttpTransport {
    /// Create a new HTTP transport with a default reqwest client
    pub fn new() -> Result<Self, ConfigError> {
        let client = ReqwestClient::builder().build()?;
        Ok(Self::from_client(client))
    }

    /// Create a transport around an existing reqwest client
    pub fn from_client(client: ReqwestClient) -> Self {
        Self { client }
    }

    /// Get the underlying reqwest client
    pub fn client(&self) -> &ReqwestClient {
        &self.client
    }

    /// Convert to reqwest request
    fn to_reqwest_request(request: Request) -> Result<reqwest::Request, TransportError> {
        let mut headers = HeaderMap::with_capacity(request.headers().len() + 1);
        for (name, value) in request.headers().iter() {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Other(format!("Invalid header name {name:?}: {e}")))?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                TransportError::Other(format!("Invalid value for header {name:?}: {e}"))
            })?;
            headers.insert(header_name, header_value);
        }

        if let Some(content_type) = request.content_type() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type.mime()));
        }

        let mut outgoing = reqwest::Request::new(request.verb().into(), request.uri().clone());
        *outgoing.headers_mut() = headers;
        if let Some(body) = request.body() {
            *outgoing.body_mut() = Some(body.clone().into());
        }

        Ok(outgoing)
    }
}

/// Flatten a header map, joining repeated headers with `", "`
fn collect_headers(map: &HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for name in map.keys() {
        let joined = map
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        headers.insert(name.as_str(), joined);
    }
    headers
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<TransportResponse, TransportError> {
        let outgoing = Self::to_reqwest_request(request)?;
        let response = self.client.execute(outgoing).await?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let body = response.bytes_stream().map_err(TransportError::from);

        Ok(TransportResponse::new(status, headers, body))
    }

    fn name(&self) -> &str {
        "reqwest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_type::ContentType;
    use crate::request::Verb;
    use url::Url;

    fn upload_request() -> Request {
        Request::new(Verb::Post, Url::parse("https://api.x.com/upload").unwrap())
    }

    #[test]
    fn test_http_transport() {
        let transport = HttpTransport::new().unwrap();
        assert_eq!(transport.name(), "reqwest");
    }

    #[test]
    fn test_reqwest_request_carries_content_type_and_body() {
        let request = upload_request()
            .with_header("Content-Type", "text/html")
            .with_header("X-Trace", "abc")
            .with_content_type(ContentType::Png)
            .with_body(vec![0x89, 0x50]);

        let outgoing = HttpTransport::to_reqwest_request(request).unwrap();
        assert_eq!(outgoing.method(), &http::Method::POST);
        assert_eq!(outgoing.url().as_str(), "https://api.x.com/upload");
        assert_eq!(outgoing.headers()["content-type"], "image/png");
        assert_eq!(outgoing.headers()["x-trace"], "abc");
        assert_eq!(
            outgoing.body().and_then(|body| body.as_bytes()),
            Some(&[0x89u8, 0x50][..])
        );
    }

    #[test]
    fn test_invalid_header_is_reported() {
        let request = upload_request().with_header("Bad Name", "v");
        let err = HttpTransport::to_reqwest_request(request).unwrap_err();
        assert!(matches!(err, TransportError::Other(message) if message.contains("Bad Name")));

        let request = upload_request().with_header("X-Ok", "line\nbreak");
        let err = HttpTransport::to_reqwest_request(request).unwrap_err();
        assert!(matches!(err, TransportError::Other(_)));
    }

    #[test]
    fn test_collect_headers_joins_repeats() {
        let mut map = HeaderMap::new();
        map.append("set-cookie", HeaderValue::from_static("a=1"));
        map.append("set-cookie", HeaderValue::from_static("b=2"));
        map.insert("content-type", HeaderValue::from_static("text/plain"));

        let headers = collect_headers(&map);
        assert_eq!(headers.get("Set-Cookie"), Some("a=1, b=2"));
        assert_eq!(headers.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_connection_failure_detection() {
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(is_connection_failure(&refused));

        let other = io::Error::new(io::ErrorKind::InvalidData, "garbage");
        assert!(!is_connection_failure(&other));
    }

    #[test]
    fn test_connection_failure_found_deep_in_source_chain() {
        #[derive(Debug, thiserror::Error)]
        #[error("{0}")]
        struct Wrapped(#[source] Box<dyn std::error::Error + Send + Sync>);

        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
        let nested = Wrapped(Box::new(Wrapped(Box::new(reset))));
        assert!(is_connection_failure(&nested));

        let garbage = io::Error::new(io::ErrorKind::InvalidData, "garbage");
        let nested = Wrapped(Box::new(Wrapped(Box::new(garbage))));
        assert!(!is_connection_failure(&nested));
    }

    #[tokio::test]
    async fn test_buffer_concatenates_chunks() {
        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"hel")),
            Ok(Bytes::from_static(b"lo")),
        ]);
        let response = TransportResponse::new(200, Headers::new(), chunks);
        assert_eq!(response.status(), 200);

        let parts = response.buffer().await.unwrap();
        assert_eq!(parts.body, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_buffer_propagates_stream_error() {
        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(TransportError::Connect("connection reset".into())),
        ]);
        let response = TransportResponse::new(200, Headers::new(), chunks);

        let err = response.buffer().await.unwrap_err();
        assert_eq!(err, TransportError::Connect("connection reset".into()));
    }
}
