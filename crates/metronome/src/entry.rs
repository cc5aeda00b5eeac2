//! Registry entries and their per-cycle ordering.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::job::Job;
use crate::schedule::Schedule;

/// One registered (schedule, job) pair plus its fire-time bookkeeping.
///
/// Owned by the scheduler's registry; once the scheduler is running only
/// the loop rewrites `next`/`prev`. Values handed out by
/// [`Scheduler::entries`] are clones — snapshots, not live references.
///
/// [`Scheduler::entries`]: crate::Scheduler::entries
#[derive(Clone)]
pub struct Entry {
    pub schedule: Schedule,
    pub(crate) job: Arc<dyn Job>,
    /// Next planned fire instant; `None` until the loop has computed it.
    pub next: Option<DateTime<Utc>>,
    /// Most recent fire instant; `None` until the job has fired once.
    pub prev: Option<DateTime<Utc>>,
}

impl Entry {
    pub(crate) fn new(schedule: Schedule, job: Arc<dyn Job>) -> Self {
        Self {
            schedule,
            job,
            next: None,
            prev: None,
        }
    }

    /// Identifier the job exposes for cancellation, if any.
    pub fn job_id(&self) -> Option<&str> {
        self.job.id()
    }

    /// Three-way comparison by next fire time, used to sort the registry
    /// every scheduling cycle.
    ///
    /// Entries whose `next` is unset sort to the back regardless of the
    /// other side; two unset entries compare `Equal`, so a stable sort
    /// keeps their relative order instead of swapping them.
    pub(crate) fn cmp_next_time(a: &Entry, b: &Entry) -> Ordering {
        match (a.next, b.next) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => x.cmp(&y),
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("schedule", &self.schedule)
            .field("job_id", &self.job.id())
            .field("next", &self.next)
            .field("prev", &self.prev)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::every;
    use crate::units;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct NamedJob(&'static str);

    #[async_trait]
    impl Job for NamedJob {
        async fn run(&self) {}

        fn id(&self) -> Option<&str> {
            Some(self.0)
        }
    }

    fn entry(name: &'static str, next: Option<DateTime<Utc>>) -> Entry {
        let mut e = Entry::new(every(units::SECOND), Arc::new(NamedJob(name)));
        e.next = next;
        e
    }

    #[test]
    fn unset_entries_sort_to_the_back() {
        let t = Utc.with_ymd_and_hms(2016, 6, 6, 10, 10, 0).unwrap();
        let mut entries = vec![entry("a", None), entry("b", None), entry("c", Some(t))];

        entries.sort_by(Entry::cmp_next_time);

        let order: Vec<_> = entries.iter().map(|e| e.job_id().unwrap()).collect();
        // the scheduled entry comes first; the unset pair keeps its
        // original relative order
        assert_eq!(order, ["c", "a", "b"]);
    }

    #[test]
    fn earlier_next_sorts_first() {
        let early = Utc.with_ymd_and_hms(2016, 6, 6, 10, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2016, 6, 6, 11, 0, 0).unwrap();
        let mut entries = vec![entry("late", Some(late)), entry("early", Some(early))];

        entries.sort_by(Entry::cmp_next_time);

        assert_eq!(entries[0].job_id(), Some("early"));
        assert_eq!(entries[1].job_id(), Some("late"));
    }

    #[test]
    fn equal_next_compares_equal() {
        let t = Utc.with_ymd_and_hms(2016, 6, 6, 10, 0, 0).unwrap();
        let a = entry("a", Some(t));
        let b = entry("b", Some(t));
        assert_eq!(Entry::cmp_next_time(&a, &b), Ordering::Equal);
    }
}
