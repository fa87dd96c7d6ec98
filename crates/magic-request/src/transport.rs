//! The transport seam and its reqwest implementation.

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::config::TransportConfig;
use crate::error::{RequestError, Result, TransportError};
use crate::logging::targets;
use crate::redirect::RedirectObserver;
use crate::request::TransportRequest;
use crate::response::{ResponseMeta, TransportResponse};

/// Executes fully assembled requests.
///
/// Implementations own connection handling, TLS and redirect following. The
/// returned future must be `'static` because the controller drives it on a
/// spawned task.
pub trait Transport: Send + Sync + 'static {
    /// Execute one request.
    fn execute(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'static, std::result::Result<TransportResponse, TransportError>>;

    /// The redirect observer this transport notifies, if it supports one.
    fn redirect_observer(&self) -> Option<&RedirectObserver> {
        None
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'static, std::result::Result<TransportResponse, TransportError>> {
        (**self).execute(request)
    }

    fn redirect_observer(&self) -> Option<&RedirectObserver> {
        (**self).redirect_observer()
    }
}

/// [`Transport`] backed by a `reqwest::Client`.
///
/// Cheap to clone; clones share the connection pool and the redirect
/// observer.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: TransportConfig,
    observer: RedirectObserver,
}

impl ReqwestTransport {
    /// Create a transport with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(TransportConfig::default())
    }

    /// Create a transport with custom configuration.
    pub fn with_config(config: TransportConfig) -> Result<Self> {
        let observer = RedirectObserver::new();
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        builder = builder.redirect(observer.policy(config.max_redirects));

        if config.cookies_enabled {
            builder = builder.cookie_store(true);
        }

        if let Some(ref ua) = config.user_agent {
            builder = builder.user_agent(ua);
        }

        let client = builder
            .build()
            .map_err(|e| RequestError::Transport(TransportError::from(e)))?;

        Ok(Self {
            client,
            config,
            observer,
        })
    }

    /// Get the transport's configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Transport for ReqwestTransport {
    fn execute(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'static, std::result::Result<TransportResponse, TransportError>> {
        let mut req_builder = self
            .client
            .request(request.method.to_reqwest(), request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        async move {
            let response = req_builder.send().await?;
            let meta = ResponseMeta::from_reqwest(&response);
            tracing::trace!(target: targets::TRANSPORT, status = meta.status, "Response headers received");
            let body = match response.bytes().await {
                Ok(body) => body,
                Err(err) => {
                    tracing::debug!(target: targets::TRANSPORT, status = meta.status, "Response body read failed: {}", err);
                    return Err(TransportError::BodyRead {
                        meta: Box::new(meta),
                        reason: err.to_string(),
                    });
                }
            };
            Ok::<_, TransportError>(TransportResponse { meta, body })
        }
        .boxed()
    }

    fn redirect_observer(&self) -> Option<&RedirectObserver> {
        Some(&self.observer)
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("config", &self.config)
            .field("observer", &self.observer)
            .finish()
    }
}
