use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Duration, Utc};

/// A wall-clock instant paired with a monotonic offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub wall: DateTime<Utc>,
    pub monotonic: StdDuration,
}

impl Reading {
    #[must_use]
    pub fn at(wall: DateTime<Utc>) -> Self {
        Self {
            wall,
            monotonic: StdDuration::ZERO,
        }
    }

    fn advance(&mut self, delta: Duration) {
        self.wall += delta;
        if let Ok(forward) = delta.to_std() {
            self.monotonic += forward;
        }
    }
}

/// Time source for timestamps and durations.
///
/// Sessions read it, never the system clock directly. Timestamps come from
/// [`Clock::now`]; durations come from [`Clock::monotonic`], which never runs
/// backward even when the wall clock is set back. `Manual` shares one reading
/// between clones: a test keeps a handle and moves time for the session that
/// owns the other.
#[derive(Debug, Clone, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(Reading),
    Manual(Arc<Mutex<Reading>>),
}

fn process_origin() -> Instant {
    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    *ORIGIN.get_or_init(Instant::now)
}

impl Clock {
    #[must_use]
    pub fn default_clock() -> Self {
        Self::System
    }

    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(Reading::at(at))
    }

    /// Shared clock starting at `at`, moved only by [`Clock::advance`].
    #[must_use]
    pub fn manual(at: DateTime<Utc>) -> Self {
        Self::Manual(Arc::new(Mutex::new(Reading::at(at))))
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.reading().wall
    }

    /// Offset from an arbitrary origin that only ever grows.
    #[must_use]
    pub fn monotonic(&self) -> StdDuration {
        self.reading().monotonic
    }

    #[must_use]
    pub fn reading(&self) -> Reading {
        match self {
            Clock::System => Reading {
                wall: Utc::now(),
                monotonic: process_origin().elapsed(),
            },
            Clock::Fixed(reading) => *reading,
            Clock::Manual(shared) => *shared.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Move a fixed or manual clock. A negative `delta` sets the wall clock
    /// back and leaves the monotonic reading where it is. No effect on the
    /// system clock.
    pub fn advance(&mut self, delta: Duration) {
        match self {
            Clock::System => {}
            Clock::Fixed(reading) => reading.advance(delta),
            Clock::Manual(shared) => {
                shared
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .advance(delta);
            }
        }
    }
}

/// 2023-11-14T22:13:20Z, the instant test clocks start from.
pub const TEST_EPOCH_SECONDS: i64 = 1_700_000_000;

/// Deterministic instant for tests.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(TEST_EPOCH_SECONDS)
}

/// Manual clock starting at [`fixed_now`].
#[must_use]
pub fn manual_clock() -> Clock {
    Clock::manual(fixed_now())
}
