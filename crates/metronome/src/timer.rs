//! Injectable wake-up timer.
//!
//! The scheduler loop never calls `tokio::time::sleep` directly; it asks a
//! [`Timer`] for a wake-up future instead, so tests can substitute an
//! instrumented implementation and observe exactly how long the loop
//! intends to sleep.

use std::time::Duration;

use futures_util::future::BoxFuture;

/// A source of wake-up signals.
pub trait Timer: Send + Sync + 'static {
    /// Return a future that resolves once `wait` has elapsed.
    fn after(&self, wait: Duration) -> BoxFuture<'static, ()>;
}

/// Default timer backed by the tokio runtime clock.
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn after(&self, wait: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(wait))
    }
}
