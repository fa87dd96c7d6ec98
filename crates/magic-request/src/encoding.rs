//! Query-string and form-body encoding.
//!
//! Query components are percent-encoded with everything outside the RFC 3986
//! unreserved set escaped, so a space becomes `%20` and reserved characters
//! such as `&` and `=` inside a key or value cannot split a pair. Form bodies
//! use `application/x-www-form-urlencoded` rules instead.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::logging::targets;

/// Characters escaped inside a query key or value.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode one query key or value.
pub fn encode_query_component(component: &str) -> String {
    utf8_percent_encode(component, QUERY_COMPONENT).to_string()
}

/// Build a query string (without the leading `?`) from key/value pairs.
///
/// Pairs are emitted in iteration order, empty keys and values included.
/// Returns `None` for an empty iterator, so callers can omit the `?`
/// entirely.
pub fn encode_query<I, K, V>(params: I) -> Option<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let pairs: Vec<String> = params
        .into_iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                encode_query_component(key.as_ref()),
                encode_query_component(value.as_ref())
            )
        })
        .collect();
    if pairs.is_empty() {
        return None;
    }
    tracing::trace!(target: targets::ENCODING, pairs = pairs.len(), "Encoded query string");
    Some(pairs.join("&"))
}

/// Encode pairs as an `application/x-www-form-urlencoded` body.
pub fn encode_form<K, V>(pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key.as_ref(), value.as_ref());
    }
    serializer.finish()
}
