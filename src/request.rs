use std::collections::{btree_map, BTreeMap, HashMap};
use std::fmt;

use bytes::Bytes;
use http::Method;
use url::Url;

use crate::content_type::ContentType;

/// HTTP verbs the client can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    /// The upper-case method token
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }

    /// Whether requests with this verb carry a body by default
    pub fn has_body(&self) -> bool {
        matches!(self, Verb::Post | Verb::Put | Verb::Patch)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Verb> for Method {
    fn from(verb: Verb) -> Self {
        match verb {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Put => Method::PUT,
            Verb::Patch => Method::PATCH,
            Verb::Delete => Method::DELETE,
        }
    }
}

/// Header mapping with case-insensitive names.
///
/// Names are stored lower-cased. Inserting a name that is already present,
/// in any case, replaces the previous value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, String>,
}

impl Headers {
    /// Create an empty header mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, returning the value it replaced
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(name.as_ref().to_ascii_lowercase(), value.into())
    }

    /// Get a header value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Remove a header, returning its value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(&name.to_ascii_lowercase())
    }

    /// Check if a header is present
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<K, V> Extend<(K, V)> for Headers
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        headers.extend(iter);
        headers
    }
}

impl From<HashMap<String, String>> for Headers {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl IntoIterator for Headers {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// An outgoing HTTP request.
///
/// Requests are values: every modifier consumes the request and hands back
/// the rewritten one. The address is always an absolute [`Url`].
#[derive(Clone, PartialEq)]
pub struct Request {
    verb: Verb,
    uri: Url,
    headers: Headers,
    content_type: Option<ContentType>,
    body: Option<Bytes>,
}

impl Request {
    /// Create a new request without headers or body
    pub fn new(verb: Verb, uri: Url) -> Self {
        Self {
            verb,
            uri,
            headers: Headers::new(),
            content_type: None,
            body: None,
        }
    }

    /// Get the HTTP verb
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Get the target address
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Get the headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get the declared content type of the body
    pub fn content_type(&self) -> Option<ContentType> {
        self.content_type
    }

    /// Get the body
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Address the request to a different URL
    pub fn with_uri(mut self, uri: Url) -> Self {
        self.uri = uri;
        self
    }

    /// Set a header, replacing any existing value under the same name
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set several headers at once
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        self.headers.extend(headers);
        self
    }

    /// Declare the content type of the body
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Set the body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body
    pub fn with_json<T>(self, value: &T) -> serde_json::Result<Self>
    where
        T: serde::Serialize,
    {
        let body = serde_json::to_vec(value)?;
        Ok(self.with_body(body).with_content_type(ContentType::Json))
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("verb", &self.verb)
            .field("uri", &self.uri.as_str())
            .field("headers", &self.headers)
            .field("content_type", &self.content_type)
            .field("body", &self.body.as_ref().map(|body| format!("{} bytes", body.len())))
            .finish()
    }
}

/// Per-call inputs for the verb convenience methods
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: BTreeMap<String, String>,
    pub headers: Headers,
    pub content_type: Option<ContentType>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body content type (body-carrying verbs default to JSON)
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }
}
