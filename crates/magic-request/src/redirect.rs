//! Redirect observation.
//!
//! A [`RedirectObserver`] is a shared slot holding an optional handler. The
//! transport calls [`RedirectObserver::notify`] right before it follows an
//! HTTP redirect; the handler can look at the redirect but never changes
//! where the transport goes next.

use std::sync::Arc;

use parking_lot::RwLock;
use url::Url;

use crate::logging::{redact_url, targets};

/// A redirect about to be followed.
///
/// Carries what reqwest's redirect `Attempt` exposes. The redirect response's
/// headers and the method of the next request are not available.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectEvent {
    /// Status code of the redirect response (301, 302, 303, 307 or 308).
    pub status: u16,
    /// URL of the request that produced the redirect response.
    pub from: Url,
    /// URL the transport is about to request next.
    pub to: Url,
    /// Number of redirects already followed before this one.
    pub hops: usize,
}

/// Handler invoked for each redirect.
pub type RedirectHandler = Arc<dyn Fn(&RedirectEvent) + Send + Sync>;

/// Shared, settable redirect hook.
///
/// Clones share the same handler slot, so the controller and the transport
/// can both hold one.
#[derive(Clone, Default)]
pub struct RedirectObserver {
    handler: Arc<RwLock<Option<RedirectHandler>>>,
}

impl RedirectObserver {
    /// Create an observer with no handler installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a handler, replacing any previous one.
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&RedirectEvent) + Send + Sync + 'static,
    {
        *self.handler.write() = Some(Arc::new(handler));
    }

    /// Remove the handler.
    pub fn clear_handler(&self) {
        self.handler.write().take();
    }

    /// Whether a handler is installed.
    pub fn has_handler(&self) -> bool {
        self.handler.read().is_some()
    }

    /// Run the handler, if any, for a redirect that is about to be followed.
    pub fn notify(&self, event: &RedirectEvent) {
        tracing::debug!(
            target: targets::REDIRECT,
            status = event.status,
            from = %redact_url(&event.from),
            to = %redact_url(&event.to),
            "Following redirect"
        );
        // Clone out of the lock so a handler may replace itself.
        let handler = self.handler.read().clone();
        if let Some(handler) = handler {
            handler(event);
        }
    }

    /// Build a reqwest redirect policy that notifies this observer and then
    /// follows, up to `max_redirects` hops.
    pub(crate) fn policy(&self, max_redirects: usize) -> reqwest::redirect::Policy {
        let observer = self.clone();
        reqwest::redirect::Policy::custom(move |attempt| {
            // `previous` starts with the original URL, so it holds one more
            // entry than the number of redirects already followed.
            let hops = attempt.previous().len().saturating_sub(1);
            if hops >= max_redirects {
                tracing::warn!(target: targets::REDIRECT, "Redirect limit of {} exceeded", max_redirects);
                return attempt.error(TooManyRedirects(max_redirects));
            }
            if let Some(from) = attempt.previous().last() {
                let event = RedirectEvent {
                    status: attempt.status().as_u16(),
                    from: from.clone(),
                    to: attempt.url().clone(),
                    hops,
                };
                observer.notify(&event);
            }
            attempt.follow()
        })
    }
}

impl std::fmt::Debug for RedirectObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedirectObserver")
            .field("has_handler", &self.has_handler())
            .finish()
    }
}

#[derive(Debug)]
struct TooManyRedirects(usize);

impl std::fmt::Display for TooManyRedirects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "too many redirects (limit {})", self.0)
    }
}

impl std::error::Error for TooManyRedirects {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event() -> RedirectEvent {
        RedirectEvent {
            status: 302,
            from: Url::parse("https://api.example.com/old").unwrap(),
            to: Url::parse("https://api.example.com/new").unwrap(),
            hops: 0,
        }
    }

    #[test]
    fn test_notify_without_handler() {
        let observer = RedirectObserver::new();
        assert!(!observer.has_handler());
        observer.notify(&event());
    }

    #[test]
    fn test_clones_share_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let observer = RedirectObserver::new();
        let shared = observer.clone();
        observer.set_handler(move |event| {
            assert_eq!(event.status, 302);
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(shared.has_handler());
        shared.notify(&event());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        shared.clear_handler();
        observer.notify(&event());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_can_replace_itself() {
        let observer = RedirectObserver::new();
        let inner = observer.clone();
        observer.set_handler(move |_| inner.clear_handler());
        observer.notify(&event());
        assert!(!observer.has_handler());
    }
}
