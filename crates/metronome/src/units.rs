//! Readable duration constants for building schedules.
//!
//! `std::time::Duration` multiplies by an integer, so `3 * units::DAY` is
//! not possible but `units::DAY * 3` is.

use std::time::Duration;

pub const SECOND: Duration = Duration::from_secs(1);
pub const MINUTE: Duration = Duration::from_secs(60);
pub const HOUR: Duration = Duration::from_secs(60 * 60);
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);
pub const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);
