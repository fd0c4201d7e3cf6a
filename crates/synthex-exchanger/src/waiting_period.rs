//! Waiting-period state derived from entry timestamps.
//!
//! A book has no stored status. Whether it is empty, still inside its
//! waiting window, or past it is derived here from the latest entry's
//! timestamp, the current time, and the configured period.

/// Derived state of one (user, destination) book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// No entries.
    Empty,
    /// The latest entry is still inside the waiting period.
    Pending { secs_left: u64 },
    /// The waiting period has fully elapsed since the latest entry.
    Elapsed,
}

impl WindowState {
    /// State of a book whose latest entry was recorded at `latest`.
    #[must_use]
    pub fn of(latest: Option<u64>, now: u64, period_secs: u64) -> Self {
        match latest {
            None => Self::Empty,
            Some(latest) => match secs_left(latest, now, period_secs) {
                0 => Self::Elapsed,
                secs_left => Self::Pending { secs_left },
            },
        }
    }

    #[must_use]
    pub fn secs_left(self) -> u64 {
        match self {
            Self::Pending { secs_left } => secs_left,
            Self::Empty | Self::Elapsed => 0,
        }
    }

    #[must_use]
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

/// `max(0, period − (now − latest))`.
///
/// A `latest` in the future (clock skew) counts as zero elapsed time.
#[must_use]
pub fn secs_left(latest: u64, now: u64, period_secs: u64) -> u64 {
    period_secs.saturating_sub(now.saturating_sub(latest))
}
