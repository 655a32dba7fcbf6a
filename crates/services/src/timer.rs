//! Tokio-backed tick source.
//!
//! [`IntervalTicks`] runs a one-second interval task while started and
//! pushes tick events into a channel drained by [`TickReceiver`]. Every
//! `start`/`stop` bumps a generation counter, so ticks queued by an earlier
//! run are dropped on receipt instead of reaching a re-armed countdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::warn;

use exam_core::TickSource;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// One-second tick source driven by a Tokio interval.
pub struct IntervalTicks {
    period: Duration,
    sender: mpsc::UnboundedSender<u64>,
    generation: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

/// Receiving half of an [`IntervalTicks`] channel.
pub struct TickReceiver {
    receiver: mpsc::UnboundedReceiver<u64>,
    generation: Arc<AtomicU64>,
}

impl IntervalTicks {
    #[must_use]
    pub fn new() -> (Self, TickReceiver) {
        Self::with_period(TICK_PERIOD)
    }

    /// Tick source with a custom period. Intended for tests and demos.
    #[must_use]
    pub fn with_period(period: Duration) -> (Self, TickReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let generation = Arc::new(AtomicU64::new(0));
        (
            Self {
                period,
                sender,
                generation: Arc::clone(&generation),
                task: None,
            },
            TickReceiver {
                receiver,
                generation,
            },
        )
    }
}

impl TickSource for IntervalTicks {
    fn start(&mut self) {
        self.stop();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no tokio runtime available; countdown will not tick");
            return;
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let sender = self.sender.clone();
        let period = self.period;
        self.task = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if sender.send(generation).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for IntervalTicks {
    fn drop(&mut self) {
        self.stop();
    }
}

impl TickReceiver {
    /// Wait for the next live tick. Returns `None` once the source is dropped.
    pub async fn recv(&mut self) -> Option<()> {
        loop {
            let generation = self.receiver.recv().await?;
            if generation == self.generation.load(Ordering::SeqCst) {
                return Some(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::Countdown;
    use tokio::time::timeout;

    #[tokio::test(start_paused = true)]
    async fn ticks_while_running_and_stops_cleanly() {
        let (mut ticks, mut rx) = IntervalTicks::new();
        ticks.start();
        assert!(ticks.is_running());

        for _ in 0..3 {
            rx.recv().await.unwrap();
        }

        ticks.stop();
        assert!(!ticks.is_running());
        let next = timeout(Duration::from_secs(5), rx.recv()).await;
        assert!(next.is_err(), "no tick after stop");
    }

    #[tokio::test(start_paused = true)]
    async fn restart_discards_queued_ticks() {
        let (mut ticks, mut rx) = IntervalTicks::new();
        ticks.start();
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        ticks.start();

        let started = Instant::now();
        rx.recv().await.unwrap();
        assert!(started.elapsed() >= TICK_PERIOD);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_drop_stops_the_task() {
        let (ticks, mut rx) = IntervalTicks::new();
        let mut countdown = Countdown::limited(10, ticks);
        countdown.arm(10);
        rx.recv().await.unwrap();
        assert!(countdown.source().is_running());

        drop(countdown);
        assert!(rx.recv().await.is_none());
    }
}
