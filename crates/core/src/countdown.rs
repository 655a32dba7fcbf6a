//! Countdown primitive driving timed sessions.
//!
//! A [`Countdown`] owns the [`TickSource`] that feeds it. The source runs
//! only while the countdown is armed: every `arm` starts it, and `disarm`,
//! expiry or drop stop it again.

use serde::{Deserialize, Serialize};
use std::fmt;

//
// ─── TIME LEFT ─────────────────────────────────────────────────────────────────
//

/// Remaining time as reported to callers.
///
/// `Unlimited` is a dedicated marker, never a numeric sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeLeft {
    Limited(u32),
    Unlimited,
}

impl TimeLeft {
    #[must_use]
    pub fn seconds(self) -> Option<u32> {
        match self {
            TimeLeft::Limited(secs) => Some(secs),
            TimeLeft::Unlimited => None,
        }
    }

    #[must_use]
    pub fn is_unlimited(self) -> bool {
        matches!(self, TimeLeft::Unlimited)
    }
}

impl fmt::Display for TimeLeft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeLeft::Limited(secs) => write!(f, "{:02}:{:02}", secs / 60, secs % 60),
            TimeLeft::Unlimited => f.write_str("--:--"),
        }
    }
}

//
// ─── TICK SOURCE ───────────────────────────────────────────────────────────────
//

/// Scheduling primitive that produces one tick per second while started.
///
/// Ticks themselves are delivered to the countdown owner out of band (for
/// example through a channel); the countdown only controls the lifecycle.
pub trait TickSource {
    /// Begin producing ticks. Starting a running source restarts it.
    fn start(&mut self);

    /// Stop producing ticks and cancel any scheduled tick. Idempotent.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

/// Tick source for tests: never ticks on its own, records lifecycle calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualTicks {
    running: bool,
    starts: u32,
    stops: u32,
}

impl ManualTicks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `start` calls observed.
    #[must_use]
    pub fn starts(&self) -> u32 {
        self.starts
    }

    /// Number of `stop` calls that actually stopped a running source.
    #[must_use]
    pub fn stops(&self) -> u32 {
        self.stops
    }
}

impl TickSource for ManualTicks {
    fn start(&mut self) {
        self.running = true;
        self.starts += 1;
    }

    fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.stops += 1;
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

//
// ─── COUNTDOWN ─────────────────────────────────────────────────────────────────
//

/// Outcome of delivering one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// The countdown was not armed; the tick was stale and had no effect.
    Ignored,
    Counting { remaining: u32 },
    /// Reached zero on this tick. Reported once per countdown.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Unlimited,
    Limited {
        remaining: u32,
        armed: bool,
        expired: bool,
    },
}

pub struct Countdown<S: TickSource> {
    mode: Mode,
    source: S,
}

impl<S: TickSource> Countdown<S> {
    /// Countdown for a timed session, unarmed, showing the full limit.
    #[must_use]
    pub fn limited(seconds: u32, source: S) -> Self {
        Self {
            mode: Mode::Limited {
                remaining: seconds,
                armed: false,
                expired: false,
            },
            source,
        }
    }

    /// Countdown for an untimed session. It never arms and never expires.
    #[must_use]
    pub fn unlimited(source: S) -> Self {
        Self {
            mode: Mode::Unlimited,
            source,
        }
    }

    /// Arm with `seconds` remaining and start the tick source.
    ///
    /// Ignored for unlimited countdowns and after expiry.
    pub fn arm(&mut self, seconds: u32) {
        if let Mode::Limited {
            remaining,
            armed,
            expired: false,
        } = &mut self.mode
        {
            *remaining = seconds;
            *armed = true;
            self.source.start();
        }
    }

    /// Re-arm from the current remaining time.
    pub fn rearm(&mut self) {
        if let TimeLeft::Limited(secs) = self.time_left() {
            self.arm(secs);
        }
    }

    /// Stop counting without touching the remaining time. Idempotent.
    pub fn disarm(&mut self) {
        if let Mode::Limited { armed, .. } = &mut self.mode {
            *armed = false;
        }
        self.source.stop();
    }

    #[must_use]
    pub fn time_left(&self) -> TimeLeft {
        match self.mode {
            Mode::Unlimited => TimeLeft::Unlimited,
            Mode::Limited { remaining, .. } => TimeLeft::Limited(remaining),
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        matches!(self.mode, Mode::Limited { armed: true, .. })
    }

    #[must_use]
    pub fn has_expired(&self) -> bool {
        matches!(self.mode, Mode::Limited { expired: true, .. })
    }

    /// Advance by one second.
    pub fn tick(&mut self) -> CountdownTick {
        let Mode::Limited {
            remaining,
            armed,
            expired,
        } = &mut self.mode
        else {
            return CountdownTick::Ignored;
        };
        if !*armed {
            return CountdownTick::Ignored;
        }

        *remaining = remaining.saturating_sub(1);
        if *remaining > 0 {
            return CountdownTick::Counting {
                remaining: *remaining,
            };
        }

        *armed = false;
        *expired = true;
        self.source.stop();
        CountdownTick::Expired
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: TickSource> Drop for Countdown<S> {
    fn drop(&mut self) {
        self.source.stop();
    }
}

impl<S: TickSource> fmt::Debug for Countdown<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Countdown")
            .field("mode", &self.mode)
            .field("source_running", &self.source.is_running())
            .finish()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
