//! Response types delivered to completion callbacks.

use bytes::Bytes;
use url::Url;

use crate::entity::Entity;
use crate::error::Result;

/// Status line, headers and final URL of a response.
#[derive(Clone, Debug)]
pub struct ResponseMeta {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: http::HeaderMap,
    /// The final URL after redirects.
    pub url: Url,
}

impl ResponseMeta {
    /// Create from a reqwest response, before its body is consumed.
    pub(crate) fn from_reqwest(response: &reqwest::Response) -> Self {
        Self {
            status: response.status().as_u16(),
            headers: response.headers().clone(),
            url: response.url().clone(),
        }
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the response is a client error (4xx status).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if the response is a server error (5xx status).
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Get the Content-Type header value.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// What a [`Transport`](crate::Transport) hands back for a completed exchange.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    /// Response metadata.
    pub meta: ResponseMeta,
    /// Raw body bytes; empty when the server sent none.
    pub body: Bytes,
}

/// A successfully completed request.
#[derive(Clone, Debug)]
pub struct Reply<T> {
    /// Decoded JSON value or raw bytes, depending on the operation.
    pub body: T,
    /// Metadata of the response the body came from.
    pub meta: ResponseMeta,
}

impl<T> Reply<T> {
    /// HTTP status code of the response.
    pub fn status(&self) -> u16 {
        self.meta.status
    }

    /// Transform the body, keeping the metadata.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        Reply {
            body: f(self.body),
            meta: self.meta,
        }
    }
}

impl Reply<serde_json::Value> {
    /// Decode a JSON object reply into an entity.
    pub fn into_entity<E: Entity>(self) -> Result<E> {
        E::from_value(self.body)
    }
}

impl Reply<Bytes> {
    /// The body as UTF-8 text, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
