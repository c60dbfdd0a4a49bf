//! Target address resolution
//!
//! Every request the client sends is addressed by joining the configured base
//! URL with an endpoint path and an optional set of query parameters.

use url::Url;

/// Join `base`, `endpoint` and `query` into a single absolute address.
///
/// Exactly one `/` separates the base path from the endpoint, whether or not
/// either side already carries separators. An empty endpoint leaves the base
/// path untouched. Query pairs are form-urlencoded and appended after any
/// query the base already has; an empty query adds nothing.
///
/// ```rust
/// use relaytpx::{resolve, Url};
///
/// let base = Url::parse("https://api.x.com").unwrap();
/// let url = resolve(&base, "users", [("id", "1")]);
/// assert_eq!(url.as_str(), "https://api.x.com/users?id=1");
/// ```
pub fn resolve<I, K, V>(base: &Url, endpoint: &str, query: I) -> Url
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut url = base.clone();

    let segment = endpoint.trim_matches('/');
    if !segment.is_empty() {
        let path = format!("{}/{}", base.path().trim_end_matches('/'), segment);
        url.set_path(&path);
    }

    let mut pairs = query.into_iter().peekable();
    if pairs.peek().is_some() {
        let mut serializer = url.query_pairs_mut();
        for (key, value) in pairs {
            serializer.append_pair(key.as_ref(), value.as_ref());
        }
    }

    url
}
