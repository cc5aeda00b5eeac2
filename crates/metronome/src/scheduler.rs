//! The coordinating loop: owns the registry, sleeps until the earliest
//! deadline, dispatches due jobs and folds in add/cancel/stop requests.

use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::entry::Entry;
use crate::job::{FnJob, Job};
use crate::schedule::Schedule;
use crate::timer::{Timer, TokioTimer};

/// Deadline used when the registry is empty: far enough out that the loop
/// never wakes just to find nothing to run, while the `select!` stays
/// responsive to add/cancel/stop.
const EMPTY_REGISTRY_HORIZON_DAYS: i64 = 15 * 365;

/// Capacity of the add/cancel mailboxes. Senders block (briefly) once it
/// is full; the hand-off is synchronous anyway so depth barely matters.
const MAILBOX_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Running,
    Stopped,
}

struct AddRequest {
    entry: Entry,
    done: oneshot::Sender<()>,
}

struct CancelRequest {
    id: String,
    done: oneshot::Sender<()>,
}

/// An in-process recurring-job scheduler.
///
/// Constructed idle; [`start`](Scheduler::start) spawns the loop task and
/// returns immediately. Once running, all mutation of the registry happens
/// on the loop task — external calls communicate intent over channels, so
/// there is a single writer by construction. A stopped scheduler is
/// terminal: build a new instance to schedule again.
///
/// Calls to `add`/`cancel`/`stop` from multiple tasks are serialized by
/// the borrow rules for the `&mut self` methods; for the `&self` methods
/// on a shared instance the caller is responsible for not racing them
/// against `start` on a not-yet-running scheduler.
pub struct Scheduler {
    state: State,
    entries: Arc<RwLock<Vec<Entry>>>,
    timer: Arc<dyn Timer>,
    add_tx: Option<mpsc::Sender<AddRequest>>,
    cancel_tx: Option<mpsc::Sender<CancelRequest>>,
    stop: CancellationToken,
    dispatched: TaskTracker,
}

impl Scheduler {
    /// A new idle scheduler using the real tokio clock.
    pub fn new() -> Self {
        Self::with_timer(TokioTimer)
    }

    /// A new idle scheduler with an injected wake-up timer.
    pub fn with_timer(timer: impl Timer) -> Self {
        Self {
            state: State::Idle,
            entries: Arc::new(RwLock::new(Vec::new())),
            timer: Arc::new(timer),
            add_tx: None,
            cancel_tx: None,
            stop: CancellationToken::new(),
            dispatched: TaskTracker::new(),
        }
    }

    /// Spawn the scheduling loop. Returns immediately.
    ///
    /// Initial `next` instants for pre-registered entries are computed by
    /// the loop task relative to its start instant. Calling `start` on a
    /// scheduler that is not idle is ignored.
    pub fn start(&mut self) {
        if self.state != State::Idle {
            warn!(state = ?self.state, "start ignored: scheduler is not idle");
            return;
        }
        let (add_tx, add_rx) = mpsc::channel(MAILBOX_DEPTH);
        let (cancel_tx, cancel_rx) = mpsc::channel(MAILBOX_DEPTH);
        self.add_tx = Some(add_tx);
        self.cancel_tx = Some(cancel_tx);
        self.state = State::Running;

        let run_loop = SchedulerLoop {
            entries: Arc::clone(&self.entries),
            timer: Arc::clone(&self.timer),
            add_rx,
            cancel_rx,
            stop: self.stop.clone(),
            dispatched: self.dispatched.clone(),
        };
        tokio::spawn(run_loop.run());
        info!("scheduler started");
    }

    /// Signal the loop to exit at its next opportunity.
    ///
    /// Idempotent; a no-op on a scheduler that is not running, including
    /// one that was never started. Never blocks. Jobs already dispatched
    /// keep running to completion on their own tasks.
    pub fn stop(&mut self) {
        if self.state != State::Running {
            return;
        }
        self.state = State::Stopped;
        self.stop.cancel();
        info!("scheduler stop requested");
    }

    /// Stop the loop, then wait until every dispatched job has finished.
    ///
    /// A job that never completes blocks this call forever; there is no
    /// per-job timeout.
    pub async fn graceful_stop(&mut self) {
        if self.state != State::Running {
            return;
        }
        self.state = State::Stopped;
        self.stop.cancel();
        self.dispatched.close();
        self.dispatched.wait().await;
        info!("scheduler stopped, all dispatched jobs finished");
    }

    /// Register a job. While running this returns only after the loop has
    /// observed the entry; before that it appends directly (there is no
    /// concurrent reader yet).
    pub async fn add(&self, schedule: Schedule, job: impl Job) {
        self.add_entry(Entry::new(schedule, Arc::new(job))).await;
    }

    /// Register a bare callable as a job.
    pub async fn add_fn<F, Fut>(&self, schedule: Schedule, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.add_entry(Entry::new(schedule, Arc::new(FnJob::new(None, f))))
            .await;
    }

    /// Register a callable under a cancellation identifier.
    pub async fn add_with_id<F, Fut>(&self, schedule: Schedule, id: impl Into<String>, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let job = FnJob::new(Some(id.into()), f);
        self.add_entry(Entry::new(schedule, Arc::new(job))).await;
    }

    /// Remove the first entry whose job exposes `id`. Best effort: a
    /// missing or non-cancellable identifier is silently a no-op.
    pub async fn cancel(&self, id: &str) {
        if self.state == State::Running {
            if let Some(tx) = &self.cancel_tx {
                let (done_tx, done_rx) = oneshot::channel();
                let req = CancelRequest {
                    id: id.to_string(),
                    done: done_tx,
                };
                if tx.send(req).await.is_ok() {
                    let _ = done_rx.await;
                    return;
                }
            }
        }
        // Not running (or the loop is already gone): no concurrent writer.
        remove_first_match(&mut self.entries.write().unwrap(), id);
    }

    /// Snapshot of the current registry.
    ///
    /// Safe to call at any time; while the scheduler is running the
    /// snapshot is advisory — its order is authoritative only after the
    /// loop's next sorting pass.
    pub fn entries(&self) -> Vec<Entry> {
        self.entries.read().unwrap().clone()
    }

    async fn add_entry(&self, entry: Entry) {
        if self.state == State::Running {
            if let Some(tx) = &self.add_tx {
                let (done_tx, done_rx) = oneshot::channel();
                let req = AddRequest {
                    entry,
                    done: done_tx,
                };
                match tx.send(req).await {
                    Ok(()) => {
                        // Synchronous hand-off: the entry is visible in
                        // entries() once the ack arrives.
                        let _ = done_rx.await;
                        return;
                    }
                    Err(mpsc::error::SendError(req)) => {
                        // Loop already exited; fall through to a direct
                        // append. The entry will never fire.
                        self.entries.write().unwrap().push(req.entry);
                        return;
                    }
                }
            }
        }
        self.entries.write().unwrap().push(entry);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // Don't leave the loop task running once the handle is gone.
        self.stop.cancel();
    }
}

struct SchedulerLoop {
    entries: Arc<RwLock<Vec<Entry>>>,
    timer: Arc<dyn Timer>,
    add_rx: mpsc::Receiver<AddRequest>,
    cancel_rx: mpsc::Receiver<CancelRequest>,
    stop: CancellationToken,
    dispatched: TaskTracker,
}

impl SchedulerLoop {
    async fn run(mut self) {
        let mut now = Utc::now();
        {
            let mut entries = self.entries.write().unwrap();
            for entry in entries.iter_mut() {
                entry.next = Some(entry.schedule.next(now));
            }
        }

        loop {
            let effective = {
                let mut entries = self.entries.write().unwrap();
                entries.sort_by(Entry::cmp_next_time);
                match entries.first().and_then(|e| e.next) {
                    Some(next) => next,
                    None => now + Duration::days(EMPTY_REGISTRY_HORIZON_DAYS),
                }
            };
            let wait = (effective - now).to_std().unwrap_or(StdDuration::ZERO);

            tokio::select! {
                _ = self.timer.after(wait) => {
                    now = Utc::now();
                    let due = self.collect_due(effective, now);
                    for job in due {
                        // The tracker registers the task before it runs,
                        // so graceful_stop cannot observe zero outstanding
                        // work while this dispatch is in flight.
                        self.dispatched.spawn(async move { job.run().await });
                    }
                }
                Some(req) = self.add_rx.recv() => {
                    now = Utc::now();
                    let mut entry = req.entry;
                    entry.next = Some(entry.schedule.next(now));
                    debug!(job_id = ?entry.job_id(), next = ?entry.next, "entry added");
                    self.entries.write().unwrap().push(entry);
                    let _ = req.done.send(());
                }
                Some(req) = self.cancel_rx.recv() => {
                    now = Utc::now();
                    if remove_first_match(&mut self.entries.write().unwrap(), &req.id) {
                        info!(job_id = %req.id, "entry cancelled");
                    } else {
                        debug!(job_id = %req.id, "cancel matched no entry");
                    }
                    let _ = req.done.send(());
                }
                _ = self.stop.cancelled() => {
                    info!("scheduler loop exiting");
                    return;
                }
            }
        }
    }

    /// Commit `prev`/`next` for every entry due at `effective` and return
    /// their jobs for dispatch.
    ///
    /// The registry is sorted, so entries tied for the effective deadline
    /// are contiguous at the front: scan from the start and stop at the
    /// first entry whose `next` differs (strict equality, not `<=`).
    fn collect_due(&self, effective: DateTime<Utc>, now: DateTime<Utc>) -> Vec<Arc<dyn Job>> {
        let mut due = Vec::new();
        let mut entries = self.entries.write().unwrap();
        for entry in entries.iter_mut() {
            if entry.next != Some(effective) {
                break;
            }
            entry.prev = Some(now);
            entry.next = Some(entry.schedule.next(now));
            due.push(Arc::clone(&entry.job));
        }
        due
    }
}

fn remove_first_match(entries: &mut Vec<Entry>, id: &str) -> bool {
    match entries.iter().position(|e| e.job_id() == Some(id)) {
        Some(pos) => {
            entries.remove(pos);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::every;
    use crate::units;
    use async_trait::async_trait;

    struct NoopJob(Option<&'static str>);

    #[async_trait]
    impl Job for NoopJob {
        async fn run(&self) {}

        fn id(&self) -> Option<&str> {
            self.0
        }
    }

    fn entry(id: Option<&'static str>) -> Entry {
        Entry::new(every(units::SECOND), Arc::new(NoopJob(id)))
    }

    #[test]
    fn remove_first_match_only_removes_one() {
        let mut entries = vec![entry(Some("x")), entry(Some("x")), entry(Some("y"))];
        assert!(remove_first_match(&mut entries, "x"));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].job_id(), Some("x"));
        assert_eq!(entries[1].job_id(), Some("y"));
    }

    #[test]
    fn remove_first_match_skips_jobs_without_identity() {
        let mut entries = vec![entry(None)];
        assert!(!remove_first_match(&mut entries, "x"));
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn add_before_start_appends_directly() {
        let scheduler = Scheduler::new();
        scheduler.add(every(units::MINUTE), NoopJob(Some("early"))).await;

        let entries = scheduler.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].job_id(), Some("early"));
        // next is unset until the loop computes it
        assert!(entries[0].next.is_none());
        assert!(entries[0].prev.is_none());
    }

    #[tokio::test]
    async fn cancel_before_start_removes_directly() {
        let scheduler = Scheduler::new();
        scheduler.add(every(units::MINUTE), NoopJob(Some("gone"))).await;
        scheduler.cancel("gone").await;
        assert!(scheduler.entries().is_empty());
        // cancelling an unknown identifier is a silent no-op
        scheduler.cancel("never-existed").await;
    }
}
