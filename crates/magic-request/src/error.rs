//! Error types for the request controller.

use crate::response::ResponseMeta;

/// Failures reported by a [`Transport`](crate::Transport).
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// HTTP request failed.
    #[error("HTTP request error: {0}")]
    Request(String),
    /// Request timed out.
    #[error("Request timed out")]
    Timeout,
    /// Connection refused or failed.
    #[error("Connection error: {0}")]
    Connection(String),
    /// Redirect limit exceeded.
    #[error("Too many redirects")]
    TooManyRedirects,
    /// The response body could not be read.
    #[error("Invalid response body: {0}")]
    InvalidBody(String),
    /// The response head arrived but reading its body failed.
    #[error("Failed to read response body (HTTP {}): {reason}", .meta.status)]
    BodyRead {
        /// Metadata of the response whose body was cut short.
        meta: Box<ResponseMeta>,
        /// Underlying error message.
        reason: String,
    },
}

impl TransportError {
    /// Response metadata, when the failure happened after the response head.
    pub fn meta(&self) -> Option<&ResponseMeta> {
        match self {
            Self::BodyRead { meta, .. } => Some(&**meta),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_redirect() {
            Self::TooManyRedirects
        } else if err.is_body() || err.is_decode() {
            Self::InvalidBody(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Errors delivered to request completion callbacks.
///
/// Only [`RequestError::Transport`] involves the network; every other variant
/// is detected locally, either before dispatch or while decoding the reply.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RequestError {
    /// The base URL could not be parsed or cannot carry relative paths.
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    /// Invalid header name or value.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    /// The assembled request URL did not parse.
    #[error("Could not build request URL '{url}': {reason}")]
    UrlBuild {
        /// The concatenated string that failed to parse.
        url: String,
        /// Parser message.
        reason: String,
    },
    /// The request body could not be encoded.
    #[error("Could not encode request body: {0}")]
    BodyEncoding(String),
    /// The transport failed before a response was available.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A response arrived but its body was not valid JSON.
    #[error("Could not decode response body (HTTP {}): {reason}", .meta.status)]
    ResponseDecode {
        /// Metadata of the response that failed to decode.
        meta: Box<ResponseMeta>,
        /// Decoder message.
        reason: String,
    },
    /// A value could not be converted to or from an [`Entity`](crate::Entity).
    #[error("Entity conversion failed: {0}")]
    Entity(String),
}

impl RequestError {
    /// Response metadata, when a response was received before the failure.
    pub fn meta(&self) -> Option<&ResponseMeta> {
        match self {
            Self::ResponseDecode { meta, .. } => Some(&**meta),
            Self::Transport(err) => err.meta(),
            _ => None,
        }
    }

    /// Whether the failure happened before anything was sent.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::InvalidBaseUrl(_) | Self::InvalidHeader(_) | Self::UrlBuild { .. } | Self::BodyEncoding(_)
        )
    }
}

impl From<http::header::InvalidHeaderName> for RequestError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for RequestError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

/// A specialized Result type for controller operations.
pub type Result<T> = std::result::Result<T, RequestError>;
