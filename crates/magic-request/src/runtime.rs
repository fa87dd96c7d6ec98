//! Runtime management for dispatched requests.
//!
//! Requests are spawned onto the tokio runtime the caller is already running
//! in. Callers outside any runtime get a small global runtime created on
//! first use.

use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Handle, Runtime};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Initialize the global fallback runtime.
///
/// Calling this is optional; the runtime is otherwise created the first time
/// a request is dispatched from outside a tokio context.
pub fn init() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("magic-request")
            .enable_all()
            .build()
            .expect("Failed to create tokio runtime")
    })
}

/// Spawn a future on the current runtime, or on the global one.
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => handle.spawn(future),
        Err(_) => init().spawn(future),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_outside_runtime() {
        let (tx, rx) = std::sync::mpsc::channel();
        spawn(async move {
            tx.send(42).unwrap();
        });
        assert_eq!(rx.recv().unwrap(), 42);
    }

    #[tokio::test]
    async fn test_spawn_inside_runtime() {
        let value = spawn(async { 7 }).await.unwrap();
        assert_eq!(value, 7);
    }
}
