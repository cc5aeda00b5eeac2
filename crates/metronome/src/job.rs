//! The dispatch contract every schedulable unit of work implements.

use std::future::Future;

use async_trait::async_trait;

/// A unit of work the scheduler can dispatch.
///
/// `run` takes no input and its outcome is not observed: errors and panics
/// inside a job are the job's own concern. A panicking job takes down only
/// its own task, never the scheduler loop.
///
/// `id` is the optional cancellation-identity capability. Jobs that return
/// `None` (the default) can never be matched by [`Scheduler::cancel`];
/// the identifier is used only for cancellation lookup, never for ordering.
///
/// [`Scheduler::cancel`]: crate::Scheduler::cancel
#[async_trait]
pub trait Job: Send + Sync + 'static {
    async fn run(&self);

    fn id(&self) -> Option<&str> {
        None
    }
}

/// Adapter wrapping a bare callable (plus an optional identifier) into a
/// [`Job`]. Built by `add_fn` / `add_with_id`.
pub(crate) struct FnJob<F> {
    id: Option<String>,
    f: F,
}

impl<F> FnJob<F> {
    pub(crate) fn new(id: Option<String>, f: F) -> Self {
        Self { id, f }
    }
}

#[async_trait]
impl<F, Fut> Job for FnJob<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn run(&self) {
        (self.f)().await;
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}
