//! Outgoing request types.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use url::Url;

/// HTTP request methods issued by the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method.
    Get,
    /// HTTP POST method.
    Post,
}

impl HttpMethod {
    /// Convert to reqwest method.
    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// A fully assembled request handed to a [`Transport`](crate::Transport).
///
/// Headers already contain the controller's default headers merged with any
/// operation-specific ones, and the body is already encoded.
#[derive(Clone, Debug)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// Absolute target URL, query string included.
    pub url: Url,
    /// Request headers.
    pub headers: http::HeaderMap,
    /// Encoded request body.
    pub body: Option<Bytes>,
}

impl TransportRequest {
    /// Get a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }
}

/// The body of a form POST.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormBody {
    /// Key/value pairs, form-urlencoded in iteration order.
    Pairs(Vec<(String, String)>),
    /// A pre-encoded body, sent verbatim.
    Raw(String),
}

impl FormBody {
    /// Encode into the bytes that go on the wire.
    pub fn encode(&self) -> String {
        match self {
            Self::Pairs(pairs) => crate::encoding::encode_form(pairs),
            Self::Raw(raw) => raw.clone(),
        }
    }
}

impl From<HashMap<String, String>> for FormBody {
    fn from(map: HashMap<String, String>) -> Self {
        Self::Pairs(map.into_iter().collect())
    }
}

impl From<BTreeMap<String, String>> for FormBody {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self::Pairs(map.into_iter().collect())
    }
}

impl From<Vec<(String, String)>> for FormBody {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::Pairs(pairs)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for FormBody {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self::Pairs(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl From<String> for FormBody {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

impl From<&str> for FormBody {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}
