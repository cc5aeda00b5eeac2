//! Pure next-occurrence arithmetic for recurring rules.
//!
//! Two rule kinds exist: *periodic* (fixed interval, anchored to second
//! boundaries) and *anchored* (fixed interval of at least one day, pinned
//! to a time of day in UTC). Both are immutable values; `next` is
//! deterministic given its inputs and never reads the wall clock.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Build a periodic schedule that recurs every `period`.
///
/// The period is normalized once, here: anything shorter than one second is
/// clamped to exactly one second, otherwise the sub-second remainder is
/// truncated away. Fire instants therefore always land on second
/// boundaries and repeated `next` calls never accumulate sub-second drift.
pub fn every(period: StdDuration) -> Schedule {
    Schedule {
        rule: Rule::Periodic {
            period_secs: period.as_secs().max(1),
        },
    }
}

/// A recurrence rule: when does the job fire next.
///
/// Constructed via [`every`], optionally refined with [`Schedule::at`].
/// The inner representation is private so an anchored rule can only exist
/// with a period of at least one day and an in-range time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Rule", into = "Rule")]
pub struct Schedule {
    rule: Rule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Rule {
    Periodic {
        period_secs: u64,
    },
    Anchored {
        period_secs: u64,
        hour: u32,
        minute: u32,
    },
}

impl Schedule {
    /// Pin this periodic schedule to a time of day, e.g. `"12:30"`.
    ///
    /// The token must be a 5-character `HH:MM` string with hour in 0-24
    /// and minute in 0-59; hour 24 rolls into the next day's `00:MM`.
    /// A malformed token is a recoverable [`ScheduleError`].
    ///
    /// # Panics
    ///
    /// Panics when called on a period shorter than one day (a time-of-day
    /// anchor is meaningless for sub-day periods) or on a schedule that is
    /// already anchored. Both are contract violations at the call site,
    /// never deferred into the running loop.
    pub fn at(self, hhmm: &str) -> Result<Schedule> {
        let period_secs = match self.rule {
            Rule::Periodic { period_secs } => period_secs,
            Rule::Anchored { .. } => panic!("at() called on an already anchored schedule"),
        };
        assert!(
            period_secs >= SECS_PER_DAY,
            "at() requires a period of at least one day"
        );
        let (hour, minute) = parse_hhmm(hhmm)?;
        Ok(Schedule {
            rule: Rule::Anchored {
                period_secs,
                hour,
                minute,
            },
        })
    }

    /// Compute the next occurrence strictly derived from `t`.
    pub fn next(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        match self.rule {
            Rule::Periodic { period_secs } => {
                truncate_to_second(t) + Duration::seconds(period_secs as i64)
            }
            Rule::Anchored {
                period_secs,
                hour,
                minute,
            } => {
                let anchor = reset(t, hour, minute);
                if t > anchor {
                    // Today's anchor has already passed.
                    anchor + Duration::seconds(period_secs as i64)
                } else {
                    anchor
                }
            }
        }
    }

    /// The normalized recurrence period.
    pub fn period(&self) -> StdDuration {
        let secs = match self.rule {
            Rule::Periodic { period_secs } | Rule::Anchored { period_secs, .. } => period_secs,
        };
        StdDuration::from_secs(secs)
    }
}

impl TryFrom<Rule> for Schedule {
    type Error = ScheduleError;

    // Deserialization goes through the same invariants as the constructors.
    fn try_from(rule: Rule) -> Result<Schedule> {
        match rule {
            Rule::Periodic { period_secs } if period_secs == 0 => {
                Err(ScheduleError::PeriodTooShort)
            }
            Rule::Anchored { period_secs, .. } if period_secs < SECS_PER_DAY => {
                Err(ScheduleError::AnchorPeriodTooShort(period_secs))
            }
            Rule::Anchored { hour, .. } if hour > 24 => Err(ScheduleError::HourOutOfRange(hour)),
            Rule::Anchored { minute, .. } if minute > 59 => {
                Err(ScheduleError::MinuteOutOfRange(minute))
            }
            rule => Ok(Schedule { rule }),
        }
    }
}

impl From<Schedule> for Rule {
    fn from(schedule: Schedule) -> Rule {
        schedule.rule
    }
}

/// Drop the sub-second part of `t`, keeping the start of its second.
fn truncate_to_second(t: DateTime<Utc>) -> DateTime<Utc> {
    t - Duration::nanoseconds(i64::from(t.timestamp_subsec_nanos()))
}

/// The instant on the same UTC calendar date as `t` with hour/minute set
/// to the anchor and seconds/sub-seconds zeroed.
fn reset(t: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
    let since_midnight = t.timestamp().rem_euclid(SECS_PER_DAY as i64);
    let midnight = truncate_to_second(t) - Duration::seconds(since_midnight);
    // Adding the anchor instead of setting fields lets hour 24 roll over
    // into the next day's 00:MM.
    midnight + Duration::hours(i64::from(hour)) + Duration::minutes(i64::from(minute))
}

/// Parse a 5-character `HH:MM` token. The hour is validated before the
/// minute, so `"25:70"` reports the hour error.
fn parse_hhmm(token: &str) -> Result<(u32, u32)> {
    let malformed = || ScheduleError::MalformedTimeToken(token.to_string());
    let bytes = token.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(malformed());
    }
    let hour: u32 = token[..2].parse().map_err(|_| malformed())?;
    let minute: u32 = token[3..].parse().map_err(|_| malformed())?;
    if hour > 24 {
        return Err(ScheduleError::HourOutOfRange(hour));
    }
    if minute > 59 {
        return Err(ScheduleError::MinuteOutOfRange(minute));
    }
    Ok((hour, minute))
}
