//! The request controller.
//!
//! A [`RequestController`] turns a relative path, optional query parameters
//! and an optional body into a [`TransportRequest`], runs it on a spawned
//! task and hands the decoded outcome to a completion callback. Every
//! operation returns immediately with a [`RequestId`]; the callback runs
//! exactly once, on a runtime worker thread.
//!
//! # Example
//!
//! ```ignore
//! use magic_request::RequestController;
//!
//! let mut controller = RequestController::parse("https://api.example.com")?;
//! controller.set_header("Authorization", "Bearer token")?;
//!
//! controller.get_with_query("search", [("q", "a b")], |result| match result {
//!     Ok(reply) => println!("{} -> {}", reply.status(), reply.body),
//!     Err(err) => eprintln!("search failed: {err}"),
//! });
//! ```

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;
use url::Url;

use crate::config::TransportConfig;
use crate::encoding::encode_query;
use crate::entity;
use crate::error::{RequestError, Result};
use crate::logging::{redact_url, targets};
use crate::redirect::RedirectEvent;
use crate::request::{FormBody, HttpMethod, TransportRequest};
use crate::response::{Reply, TransportResponse};
use crate::runtime;
use crate::transport::{ReqwestTransport, Transport};

/// Content type of JSON request bodies.
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// Content type of form request bodies.
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// Unique identifier of a dispatched request, used to correlate log output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Query parameters used by the operations that take none.
fn no_query() -> std::iter::Empty<(&'static str, &'static str)> {
    std::iter::empty()
}

/// Builder for a [`RequestController`].
pub struct RequestControllerBuilder {
    base_url: String,
    config: TransportConfig,
    transport: Option<Arc<dyn Transport>>,
    default_headers: HeaderMap,
    invalid_header: Option<RequestError>,
}

impl RequestControllerBuilder {
    /// Create a new builder for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            config: TransportConfig::default(),
            transport: None,
            default_headers: HeaderMap::new(),
            invalid_header: None,
        }
    }

    /// Configure the default reqwest transport.
    ///
    /// Ignored when a custom transport is supplied.
    pub fn config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom transport instead of [`ReqwestTransport`].
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Add a default header sent with every request.
    ///
    /// An invalid name or value makes [`build`](Self::build) fail.
    pub fn default_header(
        mut self,
        name: impl TryInto<HeaderName>,
        value: impl TryInto<HeaderValue>,
    ) -> Self {
        match (name.try_into(), value.try_into()) {
            (Ok(name), Ok(value)) => {
                self.default_headers.insert(name, value);
            }
            (Err(_), _) => {
                self.invalid_header
                    .get_or_insert(RequestError::InvalidHeader("Invalid header name".to_string()));
            }
            (_, Err(_)) => {
                self.invalid_header
                    .get_or_insert(RequestError::InvalidHeader("Invalid header value".to_string()));
            }
        }
        self
    }

    /// Build the controller.
    pub fn build(self) -> Result<RequestController> {
        if let Some(err) = self.invalid_header {
            return Err(err);
        }
        let base_url = parse_base_url(&self.base_url)?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::with_config(self.config)?),
        };
        Ok(RequestController {
            base_url,
            headers: self.default_headers,
            transport,
        })
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url)
        .map_err(|e| RequestError::InvalidBaseUrl(format!("'{base_url}': {e}")))?;
    check_base_url(url)
}

fn check_base_url(url: Url) -> Result<Url> {
    if url.cannot_be_a_base() {
        return Err(RequestError::InvalidBaseUrl(format!(
            "'{url}' cannot be used as a base URL"
        )));
    }
    // Paths are appended as text; a query or fragment would swallow them.
    if url.query().is_some() || url.fragment().is_some() {
        return Err(RequestError::InvalidBaseUrl(format!(
            "'{}' must not carry a query or fragment",
            redact_url(&url)
        )));
    }
    Ok(url)
}

/// Issues GET, POST and form POST requests relative to a fixed base URL.
///
/// Default headers are read when an operation is called: changing them
/// affects every later call and none already dispatched. Operation-specific
/// headers (the `Content-Type` of a body) are layered on top of them.
pub struct RequestController {
    base_url: Url,
    headers: HeaderMap,
    transport: Arc<dyn Transport>,
}

impl RequestController {
    /// Create a controller for an already parsed base URL, using the default
    /// reqwest transport.
    pub fn new(base_url: Url) -> Result<Self> {
        Ok(Self {
            base_url: check_base_url(base_url)?,
            headers: HeaderMap::new(),
            transport: Arc::new(ReqwestTransport::new()?),
        })
    }

    /// Create a controller from a base URL string.
    ///
    /// Fails with [`RequestError::InvalidBaseUrl`] if the string is not an
    /// absolute URL.
    pub fn parse(base_url: &str) -> Result<Self> {
        RequestControllerBuilder::new(base_url).build()
    }

    /// Create a builder for configuring a new controller.
    pub fn builder(base_url: impl Into<String>) -> RequestControllerBuilder {
        RequestControllerBuilder::new(base_url)
    }

    /// The base URL every path is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The default headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the default headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Set a default header, replacing any previous value.
    pub fn set_header(
        &mut self,
        name: impl TryInto<HeaderName>,
        value: impl TryInto<HeaderValue>,
    ) -> Result<()> {
        let name = name
            .try_into()
            .map_err(|_| RequestError::InvalidHeader("Invalid header name".to_string()))?;
        let value = value
            .try_into()
            .map_err(|_| RequestError::InvalidHeader("Invalid header value".to_string()))?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Remove a default header, returning its value.
    pub fn remove_header(&mut self, name: impl AsRef<str>) -> Option<HeaderValue> {
        self.headers.remove(name.as_ref())
    }

    /// Install a handler called before each redirect is followed.
    ///
    /// Returns `false` if the transport cannot report redirects.
    pub fn set_redirect_handler<F>(&self, handler: F) -> bool
    where
        F: Fn(&RedirectEvent) + Send + Sync + 'static,
    {
        match self.transport.redirect_observer() {
            Some(observer) => {
                observer.set_handler(handler);
                true
            }
            None => {
                tracing::warn!(target: targets::CONTROLLER, "Transport does not support redirect observation");
                false
            }
        }
    }

    /// Remove the redirect handler.
    pub fn clear_redirect_handler(&self) {
        if let Some(observer) = self.transport.redirect_observer() {
            observer.clear_handler();
        }
    }

    /// Build `base/path?query` for a request.
    ///
    /// The base URL's trailing `/` is dropped before joining, so a base of
    /// `https://api.example.com` and a path of `items` give
    /// `https://api.example.com/items`. Query pairs are percent-encoded in
    /// iteration order; pairs that cannot be encoded are left out.
    pub fn build_request_url<I, K, V>(&self, path: &str, query: I) -> Result<Url>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut target = format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path);
        if let Some(query) = encode_query(query) {
            target.push('?');
            target.push_str(&query);
        }
        Url::parse(&target).map_err(|e| RequestError::UrlBuild {
            url: target.clone(),
            reason: e.to_string(),
        })
    }

    /// GET `path` and decode the body as JSON.
    pub fn get<F>(&self, path: &str, completion: F) -> RequestId
    where
        F: FnOnce(Result<Reply<Value>>) + Send + 'static,
    {
        self.get_with_query(path, no_query(), completion)
    }

    /// GET `path` with query parameters and decode the body as JSON.
    ///
    /// The reply must be a JSON object or array. An empty, malformed or
    /// scalar body completes with [`RequestError::ResponseDecode`], which
    /// still carries the response metadata.
    pub fn get_with_query<I, K, V, F>(&self, path: &str, query: I, completion: F) -> RequestId
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
        F: FnOnce(Result<Reply<Value>>) + Send + 'static,
    {
        let request = self.prepare(HttpMethod::Get, path, query, None);
        self.dispatch(HttpMethod::Get, request, decode_json, completion)
    }

    /// GET `path` and deliver the raw body.
    pub fn get_data<F>(&self, path: &str, completion: F) -> RequestId
    where
        F: FnOnce(Result<Reply<Bytes>>) + Send + 'static,
    {
        self.get_data_with_query(path, no_query(), completion)
    }

    /// GET `path` with query parameters and deliver the raw body.
    pub fn get_data_with_query<I, K, V, F>(&self, path: &str, query: I, completion: F) -> RequestId
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
        F: FnOnce(Result<Reply<Bytes>>) + Send + 'static,
    {
        let request = self.prepare(HttpMethod::Get, path, query, None);
        self.dispatch(HttpMethod::Get, request, raw_body, completion)
    }

    /// POST a JSON body to `path` and decode the reply as JSON.
    pub fn post<B, F>(&self, path: &str, body: &B, completion: F) -> RequestId
    where
        B: Serialize + ?Sized,
        F: FnOnce(Result<Reply<Value>>) + Send + 'static,
    {
        self.post_with_query(path, no_query(), body, completion)
    }

    /// POST a JSON body to `path` with query parameters.
    ///
    /// The body must serialize to a JSON object or array; anything else
    /// completes with [`RequestError::BodyEncoding`] without a network call.
    pub fn post_with_query<I, K, V, B, F>(
        &self,
        path: &str,
        query: I,
        body: &B,
        completion: F,
    ) -> RequestId
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
        B: Serialize + ?Sized,
        F: FnOnce(Result<Reply<Value>>) + Send + 'static,
    {
        let request = encode_json(body).and_then(|body| {
            self.prepare(
                HttpMethod::Post,
                path,
                query,
                Some((CONTENT_TYPE_JSON, body)),
            )
        });
        self.dispatch(HttpMethod::Post, request, decode_json, completion)
    }

    /// POST a form body to `path` and deliver the raw reply.
    pub fn post_form<F>(&self, path: &str, body: impl Into<FormBody>, completion: F) -> RequestId
    where
        F: FnOnce(Result<Reply<Bytes>>) + Send + 'static,
    {
        self.post_form_with_query(path, no_query(), body, completion)
    }

    /// POST a form body to `path` with query parameters.
    pub fn post_form_with_query<I, K, V, F>(
        &self,
        path: &str,
        query: I,
        body: impl Into<FormBody>,
        completion: F,
    ) -> RequestId
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
        F: FnOnce(Result<Reply<Bytes>>) + Send + 'static,
    {
        let body = Bytes::from(body.into().encode());
        let request = self.prepare(
            HttpMethod::Post,
            path,
            query,
            Some((CONTENT_TYPE_FORM, body)),
        );
        self.dispatch(HttpMethod::Post, request, raw_body, completion)
    }

    /// Assemble URL, headers and body for one request.
    fn prepare<I, K, V>(
        &self,
        method: HttpMethod,
        path: &str,
        query: I,
        body: Option<(&'static str, Bytes)>,
    ) -> Result<TransportRequest>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = self.build_request_url(path, query)?;
        let mut headers = self.headers.clone();
        let body = body.map(|(content_type, bytes)| {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            bytes
        });
        Ok(TransportRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Run a prepared request on a spawned task and deliver its outcome.
    fn dispatch<T, D, F>(
        &self,
        method: HttpMethod,
        request: Result<TransportRequest>,
        decode: D,
        completion: F,
    ) -> RequestId
    where
        T: Send + 'static,
        D: FnOnce(TransportResponse) -> Result<Reply<T>> + Send + 'static,
        F: FnOnce(Result<Reply<T>>) + Send + 'static,
    {
        let id = RequestId::new();
        let span = tracing::debug_span!(
            target: targets::CONTROLLER,
            "request",
            id = id.get(),
            method = %method,
            url = tracing::field::Empty
        );
        if let Ok(request) = &request {
            span.record("url", tracing::field::display(redact_url(&request.url)));
        }

        let transport = Arc::clone(&self.transport);
        runtime::spawn(
            async move {
                let result = match request {
                    Ok(request) => {
                        tracing::debug!(target: targets::CONTROLLER, "Dispatching request");
                        match transport.execute(request).await {
                            Ok(response) => decode(response),
                            Err(err) => Err(RequestError::Transport(err)),
                        }
                    }
                    Err(err) => Err(err),
                };
                match &result {
                    Ok(reply) => {
                        tracing::debug!(target: targets::CONTROLLER, status = reply.status(), "Request completed");
                    }
                    Err(err) => {
                        tracing::warn!(target: targets::CONTROLLER, "Request failed: {}", err);
                    }
                }
                completion(result);
            }
            .instrument(span),
        );
        id
    }
}

impl FromStr for RequestController {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Debug for RequestController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestController")
            .field("base_url", &self.base_url.as_str())
            .field("headers", &self.headers)
            .finish()
    }
}

/// Serialize a JSON request body, which must be an object or an array.
fn encode_json<B: Serialize + ?Sized>(body: &B) -> Result<Bytes> {
    let value =
        serde_json::to_value(body).map_err(|e| RequestError::BodyEncoding(e.to_string()))?;
    match value {
        Value::Object(_) | Value::Array(_) => serde_json::to_vec(&value)
            .map(Bytes::from)
            .map_err(|e| RequestError::BodyEncoding(e.to_string())),
        other => Err(RequestError::BodyEncoding(format!(
            "top-level JSON value must be an object or an array, found {}",
            entity::kind(&other)
        ))),
    }
}

fn decode_json(response: TransportResponse) -> Result<Reply<Value>> {
    let TransportResponse { meta, body } = response;
    if body.is_empty() {
        return Err(RequestError::ResponseDecode {
            meta: Box::new(meta),
            reason: "empty response body".to_string(),
        });
    }
    match serde_json::from_slice::<Value>(&body) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Ok(Reply { body: value, meta }),
        Ok(other) => Err(RequestError::ResponseDecode {
            meta: Box::new(meta),
            reason: format!(
                "top-level JSON value must be an object or an array, found {}",
                entity::kind(&other)
            ),
        }),
        Err(e) => Err(RequestError::ResponseDecode {
            meta: Box::new(meta),
            reason: e.to_string(),
        }),
    }
}

fn raw_body(response: TransportResponse) -> Result<Reply<Bytes>> {
    Ok(Reply {
        body: response.body,
        meta: response.meta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseMeta;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn controller() -> RequestController {
        RequestController::parse("https://api.example.com").unwrap()
    }

    #[test]
    fn test_url_without_query() {
        let url = controller().build_request_url("items", no_query()).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/items");
    }

    #[test]
    fn test_url_with_query() {
        let url = controller()
            .build_request_url("search", [("q", "a b")])
            .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/search?q=a%20b");
    }

    #[test]
    fn test_url_with_base_path() {
        let controller = RequestController::parse("https://api.example.com/v2/").unwrap();
        let url = controller.build_request_url("users/7", no_query()).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v2/users/7");
    }

    #[test]
    fn test_url_keeps_empty_key() {
        let url = controller()
            .build_request_url("search", [("", "x"), ("page", "2")])
            .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/search?=x&page=2");
    }

    #[test]
    fn test_url_empty_query_has_no_question_mark() {
        let url = controller()
            .build_request_url("search", Vec::<(String, String)>::new())
            .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/search");
    }

    #[test]
    fn test_url_building_is_idempotent() {
        let controller = controller();
        let mut params = BTreeMap::new();
        params.insert("b".to_string(), "two words".to_string());
        params.insert("a".to_string(), "1".to_string());
        let first = controller.build_request_url("x", &params).unwrap();
        let second = controller.build_request_url("x", &params).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_str(), "https://api.example.com/x?a=1&b=two%20words");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = RequestController::parse("not a url").unwrap_err();
        assert!(matches!(err, RequestError::InvalidBaseUrl(_)));

        let err = RequestController::parse("mailto:someone@example.com").unwrap_err();
        assert!(matches!(err, RequestError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_base_url_with_query_or_fragment_is_rejected() {
        let err = RequestController::parse("https://api.example.com/v1?key=abc").unwrap_err();
        assert!(matches!(err, RequestError::InvalidBaseUrl(_)));
        assert!(!err.to_string().contains("abc"));

        let err = RequestController::parse("https://api.example.com/v1#docs").unwrap_err();
        assert!(matches!(err, RequestError::InvalidBaseUrl(_)));

        let url = Url::parse("https://api.example.com/v1?key=abc").unwrap();
        assert!(RequestController::new(url).is_err());

        let controller = RequestController::parse("https://api.example.com/v1").unwrap();
        let url = controller.build_request_url("items", [("q", "1")]).unwrap();
        assert_eq!(url.path(), "/v1/items");
        assert_eq!(url.query(), Some("q=1"));
    }

    #[test]
    fn test_from_str() {
        let controller: RequestController = "http://localhost:8080".parse().unwrap();
        assert_eq!(controller.base_url().as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_new_with_url() {
        let url = Url::parse("https://api.example.com").unwrap();
        let controller = RequestController::new(url).unwrap();
        assert_eq!(controller.base_url().host_str(), Some("api.example.com"));
    }

    #[test]
    fn test_header_management() {
        let mut controller = controller();
        controller.set_header("X-Api-Key", "secret").unwrap();
        assert_eq!(controller.headers().get("x-api-key").unwrap(), "secret");

        controller.set_header("X-Api-Key", "rotated").unwrap();
        assert_eq!(controller.headers().len(), 1);

        assert!(controller.set_header("bad header", "v").is_err());
        assert!(controller.set_header("X-Ok", "bad\nvalue").is_err());

        assert!(controller.remove_header("x-api-key").is_some());
        assert!(controller.headers().is_empty());
    }

    #[test]
    fn test_builder_rejects_invalid_header() {
        let result = RequestController::builder("https://api.example.com")
            .default_header("bad header", "v")
            .build();
        assert!(matches!(result, Err(RequestError::InvalidHeader(_))));
    }

    #[test]
    fn test_prepare_merges_content_type_over_defaults() {
        let mut controller = controller();
        controller.set_header("Content-Type", "text/plain").unwrap();
        controller.set_header("X-Trace", "1").unwrap();

        let request = controller
            .prepare(
                HttpMethod::Post,
                "items",
                no_query(),
                Some((CONTENT_TYPE_JSON, Bytes::from_static(b"{}"))),
            )
            .unwrap();

        assert_eq!(request.header("content-type"), Some(CONTENT_TYPE_JSON));
        assert_eq!(request.header("x-trace"), Some("1"));
        assert_eq!(request.headers.get_all("content-type").iter().count(), 1);
    }

    #[test]
    fn test_encode_json() {
        let bytes = encode_json(&json!({"a": [1, 2]})).unwrap();
        assert_eq!(&bytes[..], br#"{"a":[1,2]}"#);
        assert!(encode_json(&json!([1])).is_ok());

        let err = encode_json(&json!("scalar")).unwrap_err();
        assert!(matches!(err, RequestError::BodyEncoding(_)));
    }

    #[test]
    fn test_encode_json_non_string_keys() {
        let mut map = std::collections::HashMap::new();
        map.insert(vec![1u8], 1);
        let err = encode_json(&map).unwrap_err();
        assert!(matches!(err, RequestError::BodyEncoding(_)));
    }

    fn response(body: &'static [u8]) -> TransportResponse {
        TransportResponse {
            meta: ResponseMeta {
                status: 200,
                headers: HeaderMap::new(),
                url: Url::parse("https://api.example.com/items").unwrap(),
            },
            body: Bytes::from_static(body),
        }
    }

    #[test]
    fn test_decode_json() {
        let reply = decode_json(response(br#"{"ok":true}"#)).unwrap();
        assert_eq!(reply.body, json!({"ok": true}));

        let reply = decode_json(response(b"[1,2]")).unwrap();
        assert_eq!(reply.body, json!([1, 2]));
    }

    #[test]
    fn test_decode_json_rejects_top_level_scalars() {
        for body in [&b"null"[..], b"42", br#""text""#, b"true"] {
            let err = decode_json(response(body)).unwrap_err();
            assert!(matches!(err, RequestError::ResponseDecode { .. }));
            assert_eq!(err.meta().map(|m| m.status), Some(200));
        }
    }

    #[test]
    fn test_decode_json_failures_keep_meta() {
        let err = decode_json(response(b"<html>")).unwrap_err();
        assert_eq!(err.meta().map(|m| m.status), Some(200));

        let err = decode_json(response(b"")).unwrap_err();
        assert!(err.to_string().contains("empty response body"));
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), format!("#{}", a.get()));
    }
}
