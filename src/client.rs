use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ConfigError, Error, ErrorContext, Result};
use crate::interceptor::{HeaderInterceptor, Interceptor, InterceptorChain};
use crate::proxy::{ProxyConfiguration, ProxyInterceptor, RelayProxyConfiguration};
use crate::request::{Request, RequestOptions, Verb};
use crate::resolve::resolve;
use crate::response::{Response, ResponseParts};
use crate::timeout::{is_valid_timeout, with_timeout, DEFAULT_TIMEOUT};
use crate::transport::{HttpTransport, Transport, TransportError};

/// Anything that can send a [`Request`] relative to a base URL.
///
/// The verb methods are provided on top of [`send`](NetworkingClient::send):
/// they resolve the endpoint against [`base_url`](NetworkingClient::base_url),
/// attach the per-call options and hand the request over.
#[async_trait]
pub trait NetworkingClient: Send + Sync {
    /// Base URL endpoints are resolved against
    fn base_url(&self) -> &Url;

    /// Send a request and classify the outcome
    async fn send(&self, request: Request) -> Result<Response>;

    /// Build a request for `endpoint` without sending it
    fn build_request(
        &self,
        verb: Verb,
        endpoint: &str,
        body: Option<Bytes>,
        options: RequestOptions,
    ) -> Request {
        let uri = resolve(self.base_url(), endpoint, &options.query);
        let request = Request::new(verb, uri).with_headers(options.headers);

        if !verb.has_body() {
            return request;
        }

        let request = request.with_content_type(options.content_type.unwrap_or_default());
        match body {
            Some(body) => request.with_body(body),
            None => request,
        }
    }

    /// Send a GET request
    async fn get(&self, endpoint: &str, options: RequestOptions) -> Result<Response> {
        let request = self.build_request(Verb::Get, endpoint, None, options);
        self.send(request).await
    }

    /// Send a POST request
    async fn post(
        &self,
        endpoint: &str,
        body: Option<Bytes>,
        options: RequestOptions,
    ) -> Result<Response> {
        let request = self.build_request(Verb::Post, endpoint, body, options);
        self.send(request).await
    }

    /// Send a PUT request
    async fn put(
        &self,
        endpoint: &str,
        body: Option<Bytes>,
        options: RequestOptions,
    ) -> Result<Response> {
        let request = self.build_request(Verb::Put, endpoint, body, options);
        self.send(request).await
    }

    /// Send a PATCH request
    async fn patch(
        &self,
        endpoint: &str,
        body: Option<Bytes>,
        options: RequestOptions,
    ) -> Result<Response> {
        let request = self.build_request(Verb::Patch, endpoint, body, options);
        self.send(request).await
    }

    /// Send a DELETE request
    async fn delete(&self, endpoint: &str, options: RequestOptions) -> Result<Response> {
        let request = self.build_request(Verb::Delete, endpoint, None, options);
        self.send(request).await
    }
}

/// Main HTTP client
///
/// Holds the transport handle, base URL, timeout and interceptor chain. All
/// of it is fixed at construction, so a client can be cloned and shared
/// across tasks freely.
///
/// # Examples
///
/// ```rust,no_run
/// use relaytpx::{Client, NetworkingClient, RequestOptions, Response};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::builder("https://httpbin.org".parse()?).build()?;
///     match client.get("json", RequestOptions::new()).await? {
///         Response::Json(parts) => println!("{} bytes of JSON", parts.body.len()),
///         other => println!("unexpected {} response", other.kind()),
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    base_url: Url,
    timeout: Duration,
    interceptors: Arc<InterceptorChain>,
}

impl Client {
    /// Create a new client builder
    pub fn builder(base_url: Url) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    /// Create a client with default settings
    pub fn new(base_url: Url) -> std::result::Result<Self, ConfigError> {
        Self::builder(base_url).build()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the interceptor chain
    pub fn interceptors(&self) -> &InterceptorChain {
        &self.interceptors
    }

    /// Get the transport name
    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Send a request and return the classified response.
    ///
    /// Interceptors run first. The transport call and the body download then
    /// share one timeout measured from dispatch. Failures never escape as
    /// panics; they come back as an [`Error`].
    pub async fn send(&self, request: Request) -> Result<Response> {
        let request = self.interceptors.apply(request);
        let verb = request.verb();
        let url = request.uri().clone();

        debug!(%verb, %url, timeout = ?self.timeout, "dispatching request");
        let started = Instant::now();
        let outcome = with_timeout(self.dispatch(request), self.timeout).await;
        let elapsed = started.elapsed();

        let context = ErrorContext::new(verb, url, elapsed, self.transport.name());
        let error = match outcome {
            Ok(Ok(parts)) => {
                let response = Response::classify(parts);
                debug!(
                    %verb,
                    url = %context.url,
                    status = response.status(),
                    kind = response.kind(),
                    ?elapsed,
                    "received response"
                );
                return Ok(response);
            }
            Ok(Err(err)) => Error::from_transport(err, context),
            Err(deadline) => Error::timeout(deadline.to_string(), context),
        };

        warn!(
            verb = %error.context().verb,
            url = %error.context().url,
            elapsed = ?error.context().elapsed,
            "request failed: {}",
            error
        );
        Err(error)
    }

    async fn dispatch(
        &self,
        request: Request,
    ) -> std::result::Result<ResponseParts, TransportError> {
        self.transport.send(request).await?.buffer().await
    }
}

#[async_trait]
impl NetworkingClient for Client {
    fn base_url(&self) -> &Url {
        Client::base_url(self)
    }

    async fn send(&self, request: Request) -> Result<Response> {
        Client::send(self, request).await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("interceptors", &self.interceptors)
            .field("transport", &self.transport.name())
            .finish()
    }
}

/// Builder for creating HTTP clients with custom configuration
///
/// Interceptors, default headers and proxies run in the order they are added.
///
/// # Examples
///
/// ```rust
/// use relaytpx::{AuthInterceptor, ClientBuilder};
/// use std::time::Duration;
///
/// let client = ClientBuilder::parse("https://api.example.com/v1")
///     .unwrap()
///     .timeout(Duration::from_secs(30))
///     .user_agent("MyApp/1.0")
///     .interceptor(AuthInterceptor::bearer("token"))
///     .build()
///     .unwrap();
/// assert_eq!(client.interceptors().len(), 2);
/// ```
pub struct ClientBuilder {
    base_url: Url,
    timeout: Duration,
    interceptors: InterceptorChain,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Create a new client builder
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            interceptors: InterceptorChain::new(),
            transport: None,
        }
    }

    /// Create a builder from a base URL string
    pub fn parse(base_url: &str) -> std::result::Result<Self, ConfigError> {
        Ok(Self::new(ConfigError::parse_base_url(base_url)?))
    }

    /// Set the timeout for every request
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Append an interceptor to the chain
    pub fn interceptor<I>(mut self, interceptor: I) -> Self
    where
        I: Interceptor + 'static,
    {
        self.interceptors = self.interceptors.add(interceptor);
        self
    }

    /// Append a shared interceptor to the chain
    pub fn shared_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors = self.interceptors.add_shared(interceptor);
        self
    }

    /// Append a proxy rewrite to the chain
    pub fn proxy<P>(self, config: P) -> Self
    where
        P: ProxyConfiguration + 'static,
    {
        self.interceptor(ProxyInterceptor::new(config))
    }

    /// Set a header on every request
    pub fn default_header(self, name: &str, value: &str) -> Self {
        self.interceptor(HeaderInterceptor::single(name, value))
    }

    /// Set the user agent
    pub fn user_agent(self, user_agent: &str) -> Self {
        self.interceptor(HeaderInterceptor::user_agent(user_agent))
    }

    /// Use a custom transport instead of the default reqwest one
    pub fn transport<T>(mut self, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Use a shared transport handle
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client
    pub fn build(self) -> std::result::Result<Client, ConfigError> {
        if self.base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.to_string()));
        }
        if !is_valid_timeout(self.timeout) {
            return Err(ConfigError::InvalidTimeout(self.timeout));
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };

        Ok(Client {
            transport,
            base_url: self.base_url,
            timeout: self.timeout,
            interceptors: Arc::new(self.interceptors),
        })
    }
}

/// Client that sends every request through a relay proxy.
///
/// The relay rewrite is registered after all interceptors already on the
/// builder, so it sees the headers they set and has the final say on the
/// address.
#[derive(Clone, Debug)]
pub struct RelayProxyClient {
    client: Client,
    relay: RelayProxyConfiguration,
}

impl RelayProxyClient {
    /// Build a relaying client from a configured builder
    pub fn new(
        builder: ClientBuilder,
        relay: RelayProxyConfiguration,
    ) -> std::result::Result<Self, ConfigError> {
        let client = builder.proxy(relay.clone()).build()?;
        Ok(Self { client, relay })
    }

    /// Get the relay configuration
    pub fn relay(&self) -> &RelayProxyConfiguration {
        &self.relay
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl NetworkingClient for RelayProxyClient {
    fn base_url(&self) -> &Url {
        self.client.base_url()
    }

    async fn send(&self, request: Request) -> Result<Response> {
        self.client.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_type::ContentType;
    use crate::interceptor::{AuthInterceptor, CustomInterceptor};
    use crate::proxy::{INCLUDE_BODY_HEADER, RELAY_URL_HEADER};
    use crate::request::Headers;
    use crate::transport::TransportResponse;
    use futures::stream;
    use std::sync::Mutex;

    /// Answers every request with the same canned response, recording what
    /// it was sent
    struct CannedTransport {
        status: u16,
        content_type: Option<&'static str>,
        body: &'static str,
        delay: Option<Duration>,
        seen: Mutex<Vec<Request>>,
    }

    impl CannedTransport {
        fn new(status: u16, content_type: Option<&'static str>, body: &'static str) -> Self {
            Self {
                status,
                content_type,
                body,
                delay: None,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn last_request(&self) -> Request {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn send(
            &self,
            request: Request,
        ) -> std::result::Result<TransportResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let mut headers = Headers::new();
            if let Some(content_type) = self.content_type {
                headers.insert("Content-Type", content_type);
            }
            Ok(TransportResponse::full(self.status, headers, self.body))
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    struct FailingTransport(TransportError);

    #[async_trait]
    impl Transport for FailingTransport {
        async fn send(
            &self,
            _request: Request,
        ) -> std::result::Result<TransportResponse, TransportError> {
            Err(self.0.clone())
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn base() -> Url {
        Url::parse("https://api.x.com/v1/").unwrap()
    }

    fn client_with(transport: Arc<dyn Transport>) -> Client {
        Client::builder(base()).shared_transport(transport).build().unwrap()
    }

    #[test]
    fn test_client_is_shareable() {
        fn assert_shareable<T: Clone + Send + Sync + 'static>() {}
        assert_shareable::<Client>();
        assert_shareable::<RelayProxyClient>();
    }

    #[test]
    fn test_client_builder() {
        let client = ClientBuilder::new(base())
            .timeout(Duration::from_secs(30))
            .user_agent("Test/1.0")
            .build()
            .unwrap();

        assert_eq!(client.timeout(), Duration::from_secs(30));
        assert_eq!(client.interceptors().names(), vec!["Headers"]);
        assert_eq!(client.transport_name(), "reqwest");
    }

    #[test]
    fn test_default_timeout_is_five_minutes() {
        let client = Client::new(base()).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_builder_validation() {
        let result = Client::builder(base()).timeout(Duration::ZERO).build();
        assert!(matches!(result, Err(ConfigError::InvalidTimeout(_))));

        let result = Client::builder(Url::parse("data:text/plain,hi").unwrap()).build();
        assert!(matches!(result, Err(ConfigError::InvalidBaseUrl(_))));

        assert!(matches!(
            ClientBuilder::parse("/relative"),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_get_resolves_and_classifies() {
        let transport = Arc::new(CannedTransport::new(
            200,
            Some("application/json"),
            r#"{"ok":true}"#,
        ));
        let client = client_with(transport.clone());

        let response = client
            .get(
                "users",
                RequestOptions::new()
                    .query("id", "1")
                    .header("Accept", "application/json"),
            )
            .await
            .unwrap();

        assert!(matches!(response, Response::Json(_)));
        assert_eq!(response.json::<serde_json::Value>().unwrap()["ok"], true);

        let sent = transport.last_request();
        assert_eq!(sent.verb(), Verb::Get);
        assert_eq!(sent.uri().as_str(), "https://api.x.com/v1/users?id=1");
        assert_eq!(sent.headers().get("accept"), Some("application/json"));
        assert!(sent.body().is_none());
        assert!(sent.content_type().is_none());
    }

    #[tokio::test]
    async fn test_body_verbs_default_to_json() {
        let transport = Arc::new(CannedTransport::new(201, Some("text/plain"), "created"));
        let client = client_with(transport.clone());

        let response = client
            .post("users", Some(Bytes::from_static(b"{}")), RequestOptions::new())
            .await
            .unwrap();
        assert!(matches!(response, Response::PlainText(_)));
        let sent = transport.last_request();
        assert_eq!(sent.verb(), Verb::Post);
        assert_eq!(sent.content_type(), Some(ContentType::Json));
        assert_eq!(sent.body().map(|b| b.as_ref()), Some(&b"{}"[..]));

        client
            .put(
                "avatar",
                Some(Bytes::from_static(b"\xff\xd8")),
                RequestOptions::new().content_type(ContentType::Jpeg),
            )
            .await
            .unwrap();
        let sent = transport.last_request();
        assert_eq!(sent.verb(), Verb::Put);
        assert_eq!(sent.content_type(), Some(ContentType::Jpeg));

        client.patch("users/1", None, RequestOptions::new()).await.unwrap();
        let sent = transport.last_request();
        assert_eq!(sent.verb(), Verb::Patch);
        assert!(sent.body().is_none());

        client.delete("users/1", RequestOptions::new()).await.unwrap();
        let sent = transport.last_request();
        assert_eq!(sent.verb(), Verb::Delete);
        assert_eq!(sent.uri().as_str(), "https://api.x.com/v1/users/1");
        assert!(sent.content_type().is_none());
    }

    #[tokio::test]
    async fn test_error_status_is_a_response() {
        let transport = Arc::new(CannedTransport::new(
            404,
            Some("application/json"),
            r#"{"error":"missing"}"#,
        ));
        let client = client_with(transport);

        let response = client.get("users/9", RequestOptions::new()).await.unwrap();
        match response {
            Response::Error { parts, content_type } => {
                assert_eq!(parts.status, 404);
                assert_eq!(content_type, ContentType::Json);
            }
            other => panic!("expected error response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_interceptors_run_in_order_before_dispatch() {
        let transport = Arc::new(CannedTransport::new(204, None, ""));
        let client = Client::builder(base())
            .default_header("H", "1")
            .interceptor(CustomInterceptor::new("second", |request: Request| {
                request.with_header("h", "2")
            }))
            .shared_transport(transport.clone())
            .build()
            .unwrap();

        let response = client.get("", RequestOptions::new().header("H", "0")).await.unwrap();
        assert!(matches!(response, Response::Binary(_)));
        assert_eq!(transport.last_request().headers().get("H"), Some("2"));
        assert_eq!(transport.last_request().uri(), &base());
    }

    #[tokio::test]
    async fn test_relay_client_readdresses_requests() {
        let transport = Arc::new(CannedTransport::new(200, Some("image/png"), "png"));
        let relay = RelayProxyConfiguration::parse("https://relay.io/forward")
            .unwrap()
            .bypass_body_delete(true);
        let builder = Client::builder(base())
            .interceptor(AuthInterceptor::bearer("t"))
            .shared_transport(transport.clone());
        let client = RelayProxyClient::new(builder, relay).unwrap();

        let response = client.get("users", RequestOptions::new().query("x", "1")).await.unwrap();
        assert!(matches!(response, Response::PngImage(_)));

        let sent = transport.last_request();
        assert_eq!(sent.uri().as_str(), "https://relay.io/forward");
        assert_eq!(
            sent.headers().get(RELAY_URL_HEADER),
            Some("https://api.x.com/v1/users?x=1")
        );
        assert_eq!(sent.headers().get(INCLUDE_BODY_HEADER), Some("true"));
        assert_eq!(sent.headers().get("authorization"), Some("Bearer t"));
        assert_eq!(client.base_url(), &base());
        assert_eq!(client.client().interceptors().names(), vec!["Authentication", "Proxy"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_timeout_error() {
        let transport =
            Arc::new(CannedTransport::new(200, None, "late").delayed(Duration::from_secs(600)));
        let client = client_with(transport);

        let err = client.get("slow", RequestOptions::new()).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.cause(), "Request timed out after 300s");
        assert_eq!(err.context().url.as_str(), "https://api.x.com/v1/slow");
        assert_eq!(err.context().transport, "canned");

        let elapsed = err.context().elapsed;
        assert!(elapsed >= Duration::from_secs(300));
        assert!(elapsed < Duration::from_secs(301));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_body_counts_against_timeout() {
        struct SlowBody;

        #[async_trait]
        impl Transport for SlowBody {
            async fn send(
                &self,
                _request: Request,
            ) -> std::result::Result<TransportResponse, TransportError> {
                let body = stream::once(async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Ok(Bytes::from_static(b"late"))
                });
                Ok(TransportResponse::new(200, Headers::new(), body))
            }

            fn name(&self) -> &str {
                "slow-body"
            }
        }

        let client = Client::builder(base())
            .timeout(Duration::from_secs(1))
            .transport(SlowBody)
            .build()
            .unwrap();

        let err = client.get("", RequestOptions::new()).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_transport_failures_map_to_errors() {
        let cases = [
            (TransportError::Connect("connection refused".into()), "no-internet"),
            (TransportError::Timeout("read timed out".into()), "timeout"),
            (TransportError::Other("invalid header".into()), "unknown"),
        ];

        for (failure, expected) in cases {
            let client = client_with(Arc::new(FailingTransport(failure.clone())));
            let err = client.post("items", None, RequestOptions::new()).await.unwrap_err();

            let kind = match &err {
                Error::Timeout { .. } => "timeout",
                Error::NoInternetConnection { .. } => "no-internet",
                Error::Unknown { .. } => "unknown",
            };
            assert_eq!(kind, expected);
            assert_eq!(err.cause(), failure.to_string());
            assert_eq!(err.context().verb, Verb::Post);
        }
    }

    #[tokio::test]
    async fn test_body_stream_failure_is_an_error() {
        struct BrokenBody;

        #[async_trait]
        impl Transport for BrokenBody {
            async fn send(
                &self,
                _request: Request,
            ) -> std::result::Result<TransportResponse, TransportError> {
                let body = stream::iter(vec![
                    Ok(Bytes::from_static(b"par")),
                    Err(TransportError::Connect("connection reset by peer".into())),
                ]);
                Ok(TransportResponse::new(200, Headers::new(), body))
            }

            fn name(&self) -> &str {
                "broken-body"
            }
        }

        let client = Client::builder(base()).transport(BrokenBody).build().unwrap();
        let err = client.get("", RequestOptions::new()).await.unwrap_err();
        assert!(err.is_no_internet_connection());
    }

    #[tokio::test]
    async fn test_concurrent_sends_are_independent() {
        let transport = Arc::new(CannedTransport::new(200, Some("text/plain"), "ok"));
        let client = client_with(transport.clone());

        let calls = (0..16).map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .get("items", RequestOptions::new().query("n", i.to_string()))
                    .await
            })
        });

        for handle in futures::future::join_all(calls).await {
            let response = handle.unwrap().unwrap();
            assert!(matches!(response, Response::PlainText(_)));
        }
        assert_eq!(transport.seen.lock().unwrap().len(), 16);
    }
}
