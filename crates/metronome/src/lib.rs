//! `metronome` — embeddable recurring-job scheduler built on tokio.
//!
//! # Overview
//!
//! A [`Scheduler`] keeps a set of (schedule, job) pairs, sleeps until the
//! earliest deadline, dispatches every job due at that instant on its own
//! task and recomputes the next occurrence. It is a library core meant to
//! be embedded in a host application, not a daemon: no persistence, no
//! cron-expression parsing, no sub-second granularity.
//!
//! # Schedule kinds
//!
//! | Kind       | Built with           | Behaviour                                    |
//! |------------|----------------------|----------------------------------------------|
//! | Periodic   | [`every`]            | Repeat every N seconds, second-aligned       |
//! | Anchored   | [`every`]`.`[`at`]   | Period ≥ 1 day, pinned to `HH:MM` UTC        |
//!
//! [`at`]: Schedule::at
//!
//! # Example
//!
//! ```no_run
//! use metronome::{every, units, Scheduler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), metronome::ScheduleError> {
//!     let mut scheduler = Scheduler::new();
//!
//!     scheduler
//!         .add_fn(every(units::HOUR), || async {
//!             println!("every hour");
//!         })
//!         .await;
//!     scheduler
//!         .add_with_id(every(units::DAY).at("12:30")?, "daily-report", || async {
//!             println!("every day at 12:30 UTC");
//!         })
//!         .await;
//!
//!     scheduler.start();
//!
//!     // Jobs may also be added to a running scheduler.
//!     scheduler
//!         .add_fn(every(units::WEEK), || async {
//!             println!("every week");
//!         })
//!         .await;
//!
//!     scheduler.cancel("daily-report").await;
//!     scheduler.graceful_stop().await;
//!     Ok(())
//! }
//! ```

pub mod entry;
pub mod error;
pub mod job;
pub mod schedule;
pub mod scheduler;
pub mod timer;
pub mod units;

pub use entry::Entry;
pub use error::{Result, ScheduleError};
pub use job::Job;
pub use schedule::{every, Schedule};
pub use scheduler::Scheduler;
pub use timer::{Timer, TokioTimer};
