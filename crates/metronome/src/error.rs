use thiserror::Error;

/// Errors that can occur while constructing a schedule.
///
/// All of these surface at construction time; nothing propagates out of a
/// running scheduler except an intentional stop.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// The time-of-day token is not a 5-character `HH:MM` string.
    #[error("malformed HH:MM token: {0:?}")]
    MalformedTimeToken(String),

    /// Hour field outside 0-24 (24 rolls into the next day's 00:MM).
    #[error("invalid hh format: {0}")]
    HourOutOfRange(u32),

    /// Minute field outside 0-59.
    #[error("invalid mm format: {0}")]
    MinuteOutOfRange(u32),

    /// A deserialized periodic rule carried a zero-second period.
    #[error("periodic schedule requires a period of at least one second")]
    PeriodTooShort,

    /// A deserialized anchored rule carried a sub-day period.
    #[error("anchored schedule requires a period of at least one day (got {0}s)")]
    AnchorPeriodTooShort(u64),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
